use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use super::{format_salary, Level, Notice};
use crate::applications::{self, ApplyForm, DocumentUpdate};
use crate::auth::{CurrentUser, PelamarUser};
use crate::avatar::avatar_url;
use crate::error::AppResult;
use crate::jobs::{self, JobFilter};
use crate::models::{Application, ApplicationStats, ApplicationWithJob, Job, UserProfile};
use crate::profile::{self, PersonalForm};
use crate::records::{self, RecordKind};
use crate::state::AppState;

const RECENT_APPLICATIONS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct PelamarOverview {
    pub display_name: String,
    pub avatar_url: String,
    pub profile_strength: u8,
    pub total: usize,
    pub in_progress: usize,
    pub accepted: usize,
    pub recent: Vec<ApplicationWithJob>,
}

/// A listing as shown to a job seeker.
#[derive(Debug, Clone, Serialize)]
pub struct JobCard {
    #[serde(flatten)]
    pub job: Job,
    pub salary: Option<String>,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    pub card: JobCard,
    pub application: Option<Application>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonalPage {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub email: Option<String>,
    pub avatar_url: String,
    pub profile_strength: u8,
}

/// The job-seeker dashboard for one signed-in Pelamar account.
pub struct PelamarDashboard<'a> {
    state: &'a AppState,
    pelamar: PelamarUser,
    notices: Vec<Notice>,
}

impl<'a> PelamarDashboard<'a> {
    /// Fails with a redirect for employer accounts.
    pub fn open(state: &'a AppState, current: CurrentUser) -> AppResult<Self> {
        let pelamar = current.into_pelamar()?;
        let mut notices = Vec::new();
        let strength = profile::profile_strength(pelamar.profile(), pelamar.email());
        if strength < 100 {
            notices.push(Notice::new(
                Level::Info,
                format!("Your profile is {strength}% complete."),
            ));
        }
        tracing::debug!(component = "dashboard", user_id = %pelamar.user_id(), "opened Pelamar dashboard");
        Ok(Self {
            state,
            pelamar,
            notices,
        })
    }

    pub fn user(&self) -> &PelamarUser {
        &self.pelamar
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    fn avatar(&self) -> String {
        avatar_url(&self.state.config.avatar_url, self.pelamar.profile().display_name())
    }

    pub async fn overview(&self) -> AppResult<PelamarOverview> {
        let mine = applications::list_mine(self.state, &self.pelamar).await?;
        let stats: ApplicationStats = mine.iter().map(|a| a.application.status).collect();
        let profile = self.pelamar.profile();
        Ok(PelamarOverview {
            display_name: profile.display_name().to_string(),
            avatar_url: self.avatar(),
            profile_strength: profile::profile_strength(profile, self.pelamar.email()),
            total: stats.total,
            in_progress: stats.in_progress(),
            accepted: stats.accepted,
            recent: mine.into_iter().take(RECENT_APPLICATIONS).collect(),
        })
    }

    async fn applied_job_ids(&self) -> AppResult<HashSet<Uuid>> {
        let mine = applications::list_mine(self.state, &self.pelamar).await?;
        Ok(mine.into_iter().map(|a| a.application.job_id).collect())
    }

    fn cards(jobs: Vec<Job>, applied: &HashSet<Uuid>) -> Vec<JobCard> {
        jobs.into_iter()
            .map(|job| JobCard {
                salary: format_salary(job.salary_min, job.salary_max),
                applied: applied.contains(&job.id),
                job,
            })
            .collect()
    }

    pub async fn jobs(&self, filter: &JobFilter) -> AppResult<Vec<JobCard>> {
        let listings = jobs::list_active(self.state, Some(self.pelamar.token()), filter).await?;
        Ok(Self::cards(listings, &self.applied_job_ids().await?))
    }

    pub async fn job(&self, id: Uuid) -> AppResult<JobDetail> {
        let job = jobs::get_active(self.state, Some(self.pelamar.token()), id).await?;
        let application = applications::find_for_job(self.state, &self.pelamar, id).await?;
        let card = JobCard {
            salary: format_salary(job.salary_min, job.salary_max),
            applied: application.is_some(),
            job,
        };
        Ok(JobDetail { card, application })
    }

    pub async fn recommendations(&self) -> AppResult<Vec<JobCard>> {
        let listings = jobs::recommendations(self.state, Some(self.pelamar.token())).await?;
        Ok(Self::cards(listings, &self.applied_job_ids().await?))
    }

    pub async fn applications(&self) -> AppResult<Vec<ApplicationWithJob>> {
        applications::list_mine(self.state, &self.pelamar).await
    }

    pub async fn apply(&self, job_id: Uuid, form: &ApplyForm) -> AppResult<Vec<ApplicationWithJob>> {
        applications::apply(self.state, &self.pelamar, job_id, form).await?;
        self.applications().await
    }

    pub async fn update_documents(
        &self,
        id: Uuid,
        update: &DocumentUpdate,
    ) -> AppResult<Vec<ApplicationWithJob>> {
        applications::update_documents(self.state, &self.pelamar, id, update).await?;
        self.applications().await
    }

    pub async fn withdraw(&self, id: Uuid) -> AppResult<Vec<ApplicationWithJob>> {
        applications::withdraw(self.state, &self.pelamar, id).await?;
        self.applications().await
    }

    pub fn profile(&self) -> PersonalPage {
        let profile = self.pelamar.profile();
        PersonalPage {
            profile: profile.clone(),
            email: self.pelamar.email().map(str::to_string),
            avatar_url: self.avatar(),
            profile_strength: profile::profile_strength(profile, self.pelamar.email()),
        }
    }

    pub async fn save_profile(&mut self, form: &PersonalForm) -> AppResult<PersonalPage> {
        profile::update_personal(self.state, &mut self.pelamar, form).await?;
        Ok(self.profile())
    }

    pub async fn records<K: RecordKind>(&self) -> AppResult<Vec<K::Entry>> {
        records::list::<K>(self.state, &self.pelamar).await
    }

    pub async fn add_record<K: RecordKind>(&self, form: &K::Form) -> AppResult<Vec<K::Entry>> {
        records::create::<K>(self.state, &self.pelamar, form).await?;
        self.records::<K>().await
    }

    pub async fn edit_record<K: RecordKind>(&self, id: Uuid, form: &K::Form) -> AppResult<Vec<K::Entry>> {
        records::update::<K>(self.state, &self.pelamar, id, form).await?;
        self.records::<K>().await
    }

    pub async fn delete_record<K: RecordKind>(&self, id: Uuid) -> AppResult<Vec<K::Entry>> {
        records::delete::<K>(self.state, &self.pelamar, id).await?;
        self.records::<K>().await
    }
}
