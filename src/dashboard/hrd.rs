use serde::Serialize;
use uuid::Uuid;

use super::Notice;
use crate::applications;
use crate::auth::{CurrentUser, HrdUser};
use crate::error::AppResult;
use crate::jobs::{self, JobForm};
use crate::models::{Applicant, ApplicationStats, ApplicationStatus, Job};
use crate::profile::{self, CompanyInfoForm, CompanyProfile, ContactForm};
use crate::state::AppState;

const RECENT_APPLICANTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct HrdOverview {
    pub company_name: Option<String>,
    pub is_verified: bool,
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub stats: ApplicationStats,
    pub recent_applicants: Vec<Applicant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRow {
    #[serde(flatten)]
    pub job: Job,
    pub applicants: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HrdStatistics {
    pub stats: ApplicationStats,
    pub per_job: Vec<JobRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyPage {
    #[serde(flatten)]
    pub company: CompanyProfile,
    pub completeness: u8,
}

/// The employer dashboard for one signed-in HRD account.
pub struct HrdDashboard<'a> {
    state: &'a AppState,
    hrd: HrdUser,
    notices: Vec<Notice>,
}

impl<'a> HrdDashboard<'a> {
    /// Fails with a redirect for job-seeker accounts. Unverified employers get
    /// in, with a warning, but every listing write is refused.
    pub fn open(state: &'a AppState, current: CurrentUser) -> AppResult<Self> {
        let hrd = current.into_hrd()?;
        let mut notices = Vec::new();
        if !hrd.is_verified() {
            notices.push(Notice::warning(
                "Your HRD account is waiting for verification. You can edit your company profile, but you cannot post jobs yet.",
            ));
        }
        tracing::debug!(component = "dashboard", user_id = %hrd.user_id(), verified = hrd.is_verified(), "opened HRD dashboard");
        Ok(Self {
            state,
            hrd,
            notices,
        })
    }

    pub fn user(&self) -> &HrdUser {
        &self.hrd
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub async fn overview(&self) -> AppResult<HrdOverview> {
        let profile = self.hrd.profile();
        if !self.hrd.is_verified() {
            return Ok(HrdOverview {
                company_name: profile.company_name.clone(),
                is_verified: false,
                total_jobs: 0,
                active_jobs: 0,
                stats: ApplicationStats::default(),
                recent_applicants: Vec::new(),
            });
        }

        let owned = jobs::list_owned(self.state, &self.hrd).await?;
        let stats = applications::stats(self.state, &self.hrd, None).await?;
        let mut recent = applications::list_for_owner(self.state, &self.hrd).await?;
        recent.truncate(RECENT_APPLICANTS);

        Ok(HrdOverview {
            company_name: profile.company_name.clone(),
            is_verified: true,
            total_jobs: owned.len(),
            active_jobs: owned.iter().filter(|job| job.is_active).count(),
            stats,
            recent_applicants: recent,
        })
    }

    pub async fn jobs(&self) -> AppResult<Vec<JobRow>> {
        let rows = applications::applicants_per_job(self.state, &self.hrd).await?;
        Ok(rows
            .into_iter()
            .map(|(job, applicants)| JobRow { job, applicants })
            .collect())
    }

    pub async fn job(&self, id: Uuid) -> AppResult<Job> {
        self.hrd.require_verified()?;
        jobs::get_owned(self.state, &self.hrd, id).await
    }

    pub async fn create_job(&self, form: &JobForm) -> AppResult<Vec<JobRow>> {
        jobs::create(self.state, &self.hrd, form).await?;
        self.jobs().await
    }

    pub async fn update_job(&self, id: Uuid, form: &JobForm) -> AppResult<Vec<JobRow>> {
        jobs::update(self.state, &self.hrd, id, form).await?;
        self.jobs().await
    }

    pub async fn delete_job(&self, id: Uuid) -> AppResult<Vec<JobRow>> {
        jobs::delete(self.state, &self.hrd, id).await?;
        self.jobs().await
    }

    /// Applicants for one listing, or for all listings when `job_id` is `None`.
    pub async fn applicants(&self, job_id: Option<Uuid>) -> AppResult<Vec<Applicant>> {
        match job_id {
            Some(job_id) => applications::list_for_job(self.state, &self.hrd, job_id).await,
            None => applications::list_for_owner(self.state, &self.hrd).await,
        }
    }

    pub async fn applicant(&self, id: Uuid) -> AppResult<Applicant> {
        applications::get_for_owner(self.state, &self.hrd, id).await
    }

    /// Changes a status and returns the refreshed applicant list of that listing.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> AppResult<Vec<Applicant>> {
        let application = applications::update_status(self.state, &self.hrd, id, status, notes).await?;
        self.applicants(Some(application.job_id)).await
    }

    pub async fn statistics(&self, job_id: Option<Uuid>) -> AppResult<HrdStatistics> {
        let stats = applications::stats(self.state, &self.hrd, job_id).await?;
        let per_job = self
            .jobs()
            .await?
            .into_iter()
            .filter(|row| job_id.map_or(true, |id| row.job.id == id))
            .collect();
        Ok(HrdStatistics { stats, per_job })
    }

    pub fn company(&self) -> CompanyPage {
        let profile = self.hrd.profile();
        CompanyPage {
            company: profile::company_profile(profile, &self.state.config.avatar_url),
            completeness: profile::company_completeness(profile),
        }
    }

    pub async fn save_contact(&mut self, form: &ContactForm) -> AppResult<CompanyPage> {
        profile::update_contact(self.state, &mut self.hrd, form).await?;
        Ok(self.company())
    }

    pub async fn save_company_info(&mut self, form: &CompanyInfoForm) -> AppResult<CompanyPage> {
        profile::save_company_info(self.state, &mut self.hrd, form).await?;
        Ok(self.company())
    }

    pub async fn delete_company_info(&mut self) -> AppResult<CompanyPage> {
        profile::delete_company_info(self.state, &mut self.hrd).await?;
        Ok(self.company())
    }

    pub async fn save_about(&mut self, about: &str) -> AppResult<CompanyPage> {
        profile::save_company_about(self.state, &mut self.hrd, about).await?;
        Ok(self.company())
    }

    pub async fn delete_about(&mut self) -> AppResult<CompanyPage> {
        profile::delete_company_about(self.state, &mut self.hrd).await?;
        Ok(self.company())
    }

    pub async fn save_vision_mission(
        &mut self,
        vision: Option<&str>,
        mission: Option<&str>,
    ) -> AppResult<CompanyPage> {
        profile::save_vision_mission(self.state, &mut self.hrd, vision, mission).await?;
        Ok(self.company())
    }

    pub async fn delete_vision_mission(&mut self) -> AppResult<CompanyPage> {
        profile::delete_vision_mission(self.state, &mut self.hrd).await?;
        Ok(self.company())
    }
}
