use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::auth::{AccessToken, HrdUser, PelamarUser};
use crate::backend::{tables, Query};
use crate::error::{AppError, AppResult, ErrorKind};
use crate::jobs;
use crate::models::{
    Applicant, ApplicantProfile, Application, ApplicationStats, ApplicationStatus,
    ApplicationWithJob, Job, JobSummary,
};
use crate::state::AppState;
use crate::utils::json::from_rows;
use crate::validation::{
    limits, optional, storage_key, validate_pdf, UploadFile, PDF_CONTENT_TYPE,
};

pub const CV_FOLDER: &str = "cvs";
pub const COVER_LETTER_FOLDER: &str = "cover-letters";

const APPLICANT_COLUMNS: &str = "id,username,full_name,phone,role";
const JOB_SUMMARY_COLUMNS: &str = "id,title,company,location";

#[derive(Debug, Clone)]
pub enum CoverLetter {
    Text(String),
    File(UploadFile),
}

#[derive(Debug, Clone)]
pub struct ApplyForm {
    pub cv: UploadFile,
    pub cover_letter: Option<CoverLetter>,
}

/// Replacement documents for an existing application. At least one is needed.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub cv: Option<UploadFile>,
    pub cover_letter: Option<UploadFile>,
}

#[derive(Deserialize)]
struct StatusRow {
    job_id: Uuid,
    status: ApplicationStatus,
}

/// Objects uploaded during one operation, removed again if the operation fails.
struct Uploads<'a> {
    state: &'a AppState,
    token: &'a AccessToken,
    user_id: Uuid,
    keys: Vec<String>,
}

impl<'a> Uploads<'a> {
    fn new(state: &'a AppState, token: &'a AccessToken, user_id: Uuid) -> Self {
        Self {
            state,
            token,
            user_id,
            keys: Vec::new(),
        }
    }

    async fn put(&mut self, folder: &str, kind: &str, file: &UploadFile) -> AppResult<String> {
        let key = storage_key(
            folder,
            self.user_id,
            kind,
            Utc::now().timestamp_millis(),
            &file.extension(),
        );
        self.state
            .storage
            .put_object(
                Some(self.token),
                &key,
                file.bytes.clone(),
                Some(PDF_CONTENT_TYPE.to_string()),
            )
            .await?;
        tracing::debug!(component = "applications", %key, size = file.size(), "uploaded document");
        let url = self.state.storage.public_url(&key);
        self.keys.push(key);
        Ok(url)
    }

    async fn discard(self) {
        for key in self.keys {
            if let Err(err) = self.state.storage.delete_object(Some(self.token), &key).await {
                tracing::warn!(component = "applications", %key, error = %err, "failed to remove orphaned upload");
            }
        }
    }
}

/// Submits an application. Every check runs before the first upload.
pub async fn apply(
    state: &AppState,
    pelamar: &PelamarUser,
    job_id: Uuid,
    form: &ApplyForm,
) -> AppResult<Application> {
    validate_pdf(&form.cv, "CV")?;
    let cover_text = match &form.cover_letter {
        Some(CoverLetter::File(file)) => {
            validate_pdf(file, "Cover letter")?;
            None
        }
        Some(CoverLetter::Text(text)) => {
            optional("Cover letter", Some(text.as_str()), limits::COVER_LETTER)?
        }
        None => None,
    };

    jobs::get_active(state, Some(pelamar.token()), job_id).await?;
    if find_for_job(state, pelamar, job_id).await?.is_some() {
        return Err(AppError::conflict("you have already applied for this job"));
    }

    let mut uploads = Uploads::new(state, pelamar.token(), pelamar.user_id());
    let result = submit(state, pelamar, job_id, form, cover_text, &mut uploads).await;
    match result {
        Ok(application) => {
            tracing::info!(
                component = "applications",
                application_id = %application.id,
                %job_id,
                "submitted application"
            );
            Ok(application)
        }
        Err(err) => {
            tracing::error!(component = "applications", %job_id, error = %err, "application failed");
            uploads.discard().await;
            Err(err)
        }
    }
}

async fn submit(
    state: &AppState,
    pelamar: &PelamarUser,
    job_id: Uuid,
    form: &ApplyForm,
    cover_text: Option<String>,
    uploads: &mut Uploads<'_>,
) -> AppResult<Application> {
    let cv_url = uploads.put(CV_FOLDER, "cv", &form.cv).await?;
    let cover_letter_url = match &form.cover_letter {
        Some(CoverLetter::File(file)) => {
            Some(uploads.put(COVER_LETTER_FOLDER, "cover_letter", file).await?)
        }
        _ => None,
    };

    let row = json!({
        "job_id": job_id,
        "user_id": pelamar.user_id(),
        "cv_url": cv_url,
        "cover_letter": cover_text,
        "cover_letter_url": cover_letter_url,
        "status": ApplicationStatus::Pending,
    });
    let row = state
        .tables
        .insert(Some(pelamar.token()), tables::APPLICATIONS, row)
        .await
        .map_err(|err| match AppError::from(err) {
            conflict if conflict.kind() == ErrorKind::Conflict => {
                AppError::conflict("you have already applied for this job")
            }
            other => other,
        })?;
    Ok(serde_json::from_value(row)?)
}

pub async fn find_for_job(
    state: &AppState,
    pelamar: &PelamarUser,
    job_id: Uuid,
) -> AppResult<Option<Application>> {
    let query = Query::table(tables::APPLICATIONS)
        .eq("job_id", job_id)
        .eq("user_id", pelamar.user_id())
        .limit(1);
    let rows = state.tables.select(Some(pelamar.token()), &query).await?;
    Ok(from_rows(rows)?.into_iter().next())
}

pub async fn get_mine(state: &AppState, pelamar: &PelamarUser, id: Uuid) -> AppResult<Application> {
    let query = Query::table(tables::APPLICATIONS)
        .eq("id", id)
        .eq("user_id", pelamar.user_id())
        .limit(1);
    let rows = state.tables.select(Some(pelamar.token()), &query).await?;
    from_rows(rows)?.into_iter().next().ok_or_else(AppError::not_found)
}

/// The caller's applications, newest first, each with its job summary.
pub async fn list_mine(state: &AppState, pelamar: &PelamarUser) -> AppResult<Vec<ApplicationWithJob>> {
    let query = Query::table(tables::APPLICATIONS)
        .eq("user_id", pelamar.user_id())
        .newest_first();
    let applications: Vec<Application> =
        from_rows(state.tables.select(Some(pelamar.token()), &query).await?)?;

    let job_ids: HashSet<Uuid> = applications.iter().map(|a| a.job_id).collect();
    let mut summaries: HashMap<Uuid, JobSummary> = HashMap::new();
    if !job_ids.is_empty() {
        let query = Query::table(tables::JOBS)
            .columns(JOB_SUMMARY_COLUMNS)
            .is_in("id", job_ids);
        let rows: Vec<JobSummary> = from_rows(state.tables.select(Some(pelamar.token()), &query).await?)?;
        summaries = rows.into_iter().map(|job| (job.id, job)).collect();
    }

    Ok(applications
        .into_iter()
        .map(|application| ApplicationWithJob {
            job: summaries.get(&application.job_id).cloned(),
            application,
        })
        .collect())
}

/// Replaces the CV and/or cover-letter file of an undecided application.
pub async fn update_documents(
    state: &AppState,
    pelamar: &PelamarUser,
    id: Uuid,
    update: &DocumentUpdate,
) -> AppResult<Application> {
    if update.cv.is_none() && update.cover_letter.is_none() {
        return Err(AppError::bad_request(
            "choose a new CV or cover letter to upload",
        ));
    }
    if let Some(cv) = &update.cv {
        validate_pdf(cv, "CV")?;
    }
    if let Some(cover) = &update.cover_letter {
        validate_pdf(cover, "Cover letter")?;
    }

    let current = get_mine(state, pelamar, id).await?;
    if current.status.is_terminal() {
        return Err(AppError::forbidden(format!(
            "this application is already {} and can no longer be changed",
            current.status
        )));
    }

    let mut uploads = Uploads::new(state, pelamar.token(), pelamar.user_id());
    let result = replace_documents(state, pelamar, id, update, &mut uploads).await;
    match result {
        Ok(application) => {
            tracing::info!(component = "applications", application_id = %id, "replaced application documents");
            Ok(application)
        }
        Err(err) => {
            uploads.discard().await;
            Err(err)
        }
    }
}

async fn replace_documents(
    state: &AppState,
    pelamar: &PelamarUser,
    id: Uuid,
    update: &DocumentUpdate,
    uploads: &mut Uploads<'_>,
) -> AppResult<Application> {
    let mut patch = Map::new();
    if let Some(cv) = &update.cv {
        patch.insert("cv_url".into(), json!(uploads.put(CV_FOLDER, "cv", cv).await?));
    }
    if let Some(cover) = &update.cover_letter {
        let url = uploads.put(COVER_LETTER_FOLDER, "cover_letter", cover).await?;
        patch.insert("cover_letter_url".into(), json!(url));
        patch.insert("cover_letter".into(), Value::Null);
    }
    patch.insert("updated_at".into(), json!(Utc::now()));

    let query = Query::table(tables::APPLICATIONS)
        .eq("id", id)
        .eq("user_id", pelamar.user_id());
    let rows = state
        .tables
        .update(Some(pelamar.token()), &query, Value::Object(patch))
        .await?;
    from_rows(rows)?
        .into_iter()
        .next()
        .ok_or_else(AppError::not_found)
}

/// Deletes an undecided application.
pub async fn withdraw(state: &AppState, pelamar: &PelamarUser, id: Uuid) -> AppResult<()> {
    let current = get_mine(state, pelamar, id).await?;
    if current.status.is_terminal() {
        return Err(AppError::forbidden(format!(
            "this application is already {} and can no longer be withdrawn",
            current.status
        )));
    }
    let query = Query::table(tables::APPLICATIONS)
        .eq("id", id)
        .eq("user_id", pelamar.user_id());
    let deleted = state.tables.delete(Some(pelamar.token()), &query).await?;
    if deleted.is_empty() {
        return Err(AppError::not_found());
    }
    tracing::info!(component = "applications", application_id = %id, "withdrew application");
    Ok(())
}

async fn attach_profiles(
    state: &AppState,
    hrd: &HrdUser,
    applications: Vec<Application>,
    titles: &HashMap<Uuid, String>,
) -> AppResult<Vec<Applicant>> {
    let user_ids: HashSet<Uuid> = applications.iter().map(|a| a.user_id).collect();
    let mut profiles: HashMap<Uuid, ApplicantProfile> = HashMap::new();
    if !user_ids.is_empty() {
        let query = Query::table(tables::USER_PROFILES)
            .columns(APPLICANT_COLUMNS)
            .is_in("id", user_ids);
        let rows: Vec<ApplicantProfile> = from_rows(state.tables.select(Some(hrd.token()), &query).await?)?;
        profiles = rows.into_iter().map(|p| (p.id, p)).collect();
    }

    Ok(applications
        .into_iter()
        .map(|application| Applicant {
            profile: profiles.get(&application.user_id).cloned(),
            job_title: titles.get(&application.job_id).cloned(),
            application,
        })
        .collect())
}

/// Applicants for one of the caller's listings, newest first.
pub async fn list_for_job(state: &AppState, hrd: &HrdUser, job_id: Uuid) -> AppResult<Vec<Applicant>> {
    hrd.require_verified()?;
    let job = jobs::get_owned(state, hrd, job_id).await?;
    let query = Query::table(tables::APPLICATIONS)
        .eq("job_id", job_id)
        .newest_first();
    let applications: Vec<Application> =
        from_rows(state.tables.select(Some(hrd.token()), &query).await?)?;
    let titles = HashMap::from([(job.id, job.title)]);
    attach_profiles(state, hrd, applications, &titles).await
}

/// Applicants across every listing the caller owns, newest first.
pub async fn list_for_owner(state: &AppState, hrd: &HrdUser) -> AppResult<Vec<Applicant>> {
    let owned = jobs::list_owned(state, hrd).await?;
    if owned.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::table(tables::APPLICATIONS)
        .is_in("job_id", owned.iter().map(|job| job.id))
        .newest_first();
    let applications: Vec<Application> =
        from_rows(state.tables.select(Some(hrd.token()), &query).await?)?;
    let titles: HashMap<Uuid, String> = owned.into_iter().map(|job| (job.id, job.title)).collect();
    attach_profiles(state, hrd, applications, &titles).await
}

/// One application to a listing the caller owns.
pub async fn get_for_owner(state: &AppState, hrd: &HrdUser, id: Uuid) -> AppResult<Applicant> {
    hrd.require_verified()?;
    let query = Query::table(tables::APPLICATIONS).eq("id", id).limit(1);
    let application: Application = from_rows(state.tables.select(Some(hrd.token()), &query).await?)?
        .into_iter()
        .next()
        .ok_or_else(AppError::not_found)?;
    let job = jobs::get_owned(state, hrd, application.job_id).await?;
    let titles = HashMap::from([(job.id, job.title)]);
    attach_profiles(state, hrd, vec![application], &titles)
        .await?
        .pop()
        .ok_or_else(AppError::not_found)
}

/// Moves an application to any status. `notes` replaces the stored note when
/// given; a blank note clears it and `None` leaves it unchanged.
pub async fn update_status(
    state: &AppState,
    hrd: &HrdUser,
    id: Uuid,
    status: ApplicationStatus,
    notes: Option<&str>,
) -> AppResult<Application> {
    let current = get_for_owner(state, hrd, id).await?;

    let mut patch = json!({
        "status": status,
        "updated_at": Utc::now(),
    });
    if notes.is_some() {
        patch["notes"] = json!(optional("Notes", notes, limits::NOTES)?);
    }

    let query = Query::table(tables::APPLICATIONS).eq("id", id);
    let application: Application = from_rows(state.tables.update(Some(hrd.token()), &query, patch).await?)?
        .into_iter()
        .next()
        .ok_or_else(AppError::not_found)?;
    tracing::info!(
        component = "applications",
        application_id = %id,
        from = %current.application.status,
        to = %status,
        "changed application status"
    );
    Ok(application)
}

async fn owned_status_rows(state: &AppState, hrd: &HrdUser, owned: &[Job]) -> AppResult<Vec<StatusRow>> {
    if owned.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::table(tables::APPLICATIONS)
        .columns("job_id,status")
        .is_in("job_id", owned.iter().map(|job| job.id));
    Ok(from_rows(state.tables.select(Some(hrd.token()), &query).await?)?)
}

/// Counts per status, for one listing or for all of the caller's listings.
pub async fn stats(state: &AppState, hrd: &HrdUser, job_id: Option<Uuid>) -> AppResult<ApplicationStats> {
    let owned = match job_id {
        Some(job_id) => {
            hrd.require_verified()?;
            vec![jobs::get_owned(state, hrd, job_id).await?]
        }
        None => jobs::list_owned(state, hrd).await?,
    };
    let rows = owned_status_rows(state, hrd, &owned).await?;
    Ok(rows.into_iter().map(|row| row.status).collect())
}

/// Every owned listing with its number of applicants, newest listing first.
pub async fn applicants_per_job(state: &AppState, hrd: &HrdUser) -> AppResult<Vec<(Job, usize)>> {
    let owned = jobs::list_owned(state, hrd).await?;
    let rows = owned_status_rows(state, hrd, &owned).await?;
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.job_id).or_default() += 1;
    }
    Ok(owned
        .into_iter()
        .map(|job| {
            let count = counts.get(&job.id).copied().unwrap_or(0);
            (job, count)
        })
        .collect())
}
