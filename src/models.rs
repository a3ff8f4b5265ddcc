use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dashboard::Page;
use crate::utils::json::null_as_default;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "HRD")]
    Hrd,
    Pelamar,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Hrd => "HRD",
            Role::Pelamar => "Pelamar",
        }
    }

    pub fn dashboard(&self) -> Page {
        match self {
            Role::Hrd => Page::HrdDashboard,
            Role::Pelamar => Page::PelamarDashboard,
        }
    }

    /// New HRD accounts wait for manual verification; job seekers do not.
    pub fn verified_on_signup(&self) -> bool {
        matches!(self, Role::Pelamar)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hrd" => Ok(Role::Hrd),
            "pelamar" => Ok(Role::Pelamar),
            other => Err(format!("unknown role {other}, expected HRD or Pelamar")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    #[serde(rename = "Lolos Administrasi")]
    PassedAdministration,
    #[serde(rename = "Lolos Test Tulis")]
    PassedWrittenTest,
    #[serde(rename = "Lolos Wawancara")]
    PassedInterview,
    #[serde(rename = "Diterima")]
    Accepted,
    #[serde(rename = "Ditolak")]
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Pending,
        ApplicationStatus::PassedAdministration,
        ApplicationStatus::PassedWrittenTest,
        ApplicationStatus::PassedInterview,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::PassedAdministration => "Lolos Administrasi",
            ApplicationStatus::PassedWrittenTest => "Lolos Test Tulis",
            ApplicationStatus::PassedInterview => "Lolos Wawancara",
            ApplicationStatus::Accepted => "Diterima",
            ApplicationStatus::Rejected => "Ditolak",
        }
    }

    /// Decided applications are frozen for the applicant.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Accepted | ApplicationStatus::Rejected)
    }

    pub fn is_in_progress(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    /// Accepts the stored label (`Lolos Test Tulis`) or a dashed CLI form
    /// (`lolos-test-tulis`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ").to_lowercase();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown application status {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_verified: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Pengguna")
    }
}

/// The subset of a profile an employer may see for an applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub id: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub employment_type: Option<String>,
    pub created_by: Uuid,
    #[serde(default = "default_active", deserialize_with = "active_or_default")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

fn active_or_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_active))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub cv_url: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub cover_letter_url: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An applicant's own application with the job it targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationWithJob {
    #[serde(flatten)]
    pub application: Application,
    pub job: Option<JobSummary>,
}

/// An application as the employer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applicant {
    #[serde(flatten)]
    pub application: Application,
    pub profile: Option<ApplicantProfile>,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationStats {
    pub total: usize,
    pub pending: usize,
    pub passed_administration: usize,
    pub passed_written_test: usize,
    pub passed_interview: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl ApplicationStats {
    pub fn record(&mut self, status: ApplicationStatus) {
        self.total += 1;
        let slot = match status {
            ApplicationStatus::Pending => &mut self.pending,
            ApplicationStatus::PassedAdministration => &mut self.passed_administration,
            ApplicationStatus::PassedWrittenTest => &mut self.passed_written_test,
            ApplicationStatus::PassedInterview => &mut self.passed_interview,
            ApplicationStatus::Accepted => &mut self.accepted,
            ApplicationStatus::Rejected => &mut self.rejected,
        };
        *slot += 1;
    }

    pub fn in_progress(&self) -> usize {
        self.pending + self.passed_administration + self.passed_written_test + self.passed_interview
    }
}

impl FromIterator<ApplicationStatus> for ApplicationStats {
    fn from_iter<T: IntoIterator<Item = ApplicationStatus>>(iter: T) -> Self {
        let mut stats = ApplicationStats::default();
        for status in iter {
            stats.record(status);
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_current: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_name: String,
    pub degree: String,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_current: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub issuing_organization: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub credential_id: Option<String>,
    #[serde(default)]
    pub credential_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
