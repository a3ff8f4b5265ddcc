use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AccessToken, HrdUser};
use crate::backend::{tables, Filter, Query};
use crate::error::{AppError, AppResult};
use crate::models::Job;
use crate::state::AppState;
use crate::utils::json::from_rows;
use crate::validation::{limits, optional, required};

pub const RECOMMENDATION_LIMIT: usize = 10;
pub const DEFAULT_EMPLOYMENT_TYPE: &str = "Full-time";

/// Narrowing for the public job list. Blank fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub category: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl JobFilter {
    fn apply(&self, mut query: Query) -> Query {
        if let Some(category) = blank_to_none(self.category.as_deref()) {
            query = query.eq("category", category);
        }
        if let Some(location) = blank_to_none(self.location.as_deref()) {
            query = query.ilike("location", location);
        }
        if let Some(search) = blank_to_none(self.search.as_deref()) {
            query = query.any_of(vec![
                Filter::ilike("title", search),
                Filter::ilike("description", search),
                Filter::ilike("company", search),
            ]);
        }
        query
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobForm {
    pub title: String,
    pub company: String,
    pub description: String,
    pub requirements: String,
    pub location: Option<String>,
    pub category: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub employment_type: Option<String>,
}

impl JobForm {
    fn to_row(&self) -> AppResult<Value> {
        let title = required("Title", &self.title, limits::JOB_TITLE)?;
        let company = required("Company", &self.company, limits::COMPANY_NAME)?;
        let description = required("Description", &self.description, limits::JOB_TEXT)?;
        let requirements = required("Requirements", &self.requirements, limits::JOB_TEXT)?;
        let location = optional("Location", self.location.as_deref(), limits::JOB_FIELD)?;
        let category = optional("Category", self.category.as_deref(), limits::JOB_FIELD)?;
        let employment_type =
            optional("Employment type", self.employment_type.as_deref(), limits::JOB_FIELD)?
                .unwrap_or_else(|| DEFAULT_EMPLOYMENT_TYPE.to_string());

        for salary in [self.salary_min, self.salary_max].into_iter().flatten() {
            if salary < 0 {
                return Err(AppError::bad_request("salary must not be negative"));
            }
        }
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(AppError::bad_request(
                    "minimum salary must not exceed maximum salary",
                ));
            }
        }

        Ok(json!({
            "title": title,
            "company": company,
            "description": description,
            "requirements": requirements,
            "location": location,
            "category": category,
            "salary_min": self.salary_min,
            "salary_max": self.salary_max,
            "employment_type": employment_type,
        }))
    }
}

/// Active listings, newest first.
pub async fn list_active(
    state: &AppState,
    token: Option<&AccessToken>,
    filter: &JobFilter,
) -> AppResult<Vec<Job>> {
    let query = filter
        .apply(Query::table(tables::JOBS).eq("is_active", true))
        .newest_first();
    let rows = state.tables.select(token, &query).await?;
    Ok(from_rows(rows)?)
}

pub async fn get_active(state: &AppState, token: Option<&AccessToken>, id: Uuid) -> AppResult<Job> {
    let query = Query::table(tables::JOBS)
        .eq("id", id)
        .eq("is_active", true)
        .limit(1);
    first_job(state.tables.select(token, &query).await?)
}

/// The newest active listings. No ranking beyond recency.
pub async fn recommendations(state: &AppState, token: Option<&AccessToken>) -> AppResult<Vec<Job>> {
    let query = Query::table(tables::JOBS)
        .eq("is_active", true)
        .newest_first()
        .limit(RECOMMENDATION_LIMIT);
    let rows = state.tables.select(token, &query).await?;
    Ok(from_rows(rows)?)
}

pub async fn list_owned(state: &AppState, hrd: &HrdUser) -> AppResult<Vec<Job>> {
    hrd.require_verified()?;
    let query = Query::table(tables::JOBS)
        .eq("created_by", hrd.user_id())
        .newest_first();
    let rows = state.tables.select(Some(hrd.token()), &query).await?;
    Ok(from_rows(rows)?)
}

/// Loads a listing and checks that `hrd` created it.
pub async fn get_owned(state: &AppState, hrd: &HrdUser, id: Uuid) -> AppResult<Job> {
    let query = Query::table(tables::JOBS).eq("id", id).limit(1);
    let job = first_job(state.tables.select(Some(hrd.token()), &query).await?)?;
    if job.created_by != hrd.user_id() {
        tracing::warn!(component = "jobs", job_id = %id, user_id = %hrd.user_id(), "job owned by another account");
        return Err(AppError::forbidden("this job listing belongs to another account"));
    }
    Ok(job)
}

pub async fn create(state: &AppState, hrd: &HrdUser, form: &JobForm) -> AppResult<Job> {
    hrd.require_verified()?;
    let mut row = form.to_row()?;
    row["created_by"] = json!(hrd.user_id());
    row["is_active"] = json!(true);

    let row = state
        .tables
        .insert(Some(hrd.token()), tables::JOBS, row)
        .await?;
    let job: Job = serde_json::from_value(row)?;
    tracing::info!(component = "jobs", job_id = %job.id, title = %job.title, "created job listing");
    Ok(job)
}

pub async fn update(state: &AppState, hrd: &HrdUser, id: Uuid, form: &JobForm) -> AppResult<Job> {
    hrd.require_verified()?;
    let mut patch = form.to_row()?;
    patch["updated_at"] = json!(Utc::now());

    let query = Query::table(tables::JOBS)
        .eq("id", id)
        .eq("created_by", hrd.user_id());
    let job = first_job(state.tables.update(Some(hrd.token()), &query, patch).await?)?;
    tracing::info!(component = "jobs", job_id = %job.id, "updated job listing");
    Ok(job)
}

/// Removes a listing permanently.
pub async fn delete(state: &AppState, hrd: &HrdUser, id: Uuid) -> AppResult<()> {
    hrd.require_verified()?;
    get_owned(state, hrd, id).await?;

    let query = Query::table(tables::JOBS)
        .eq("id", id)
        .eq("created_by", hrd.user_id());
    let deleted = state.tables.delete(Some(hrd.token()), &query).await?;
    if deleted.is_empty() {
        return Err(AppError::not_found());
    }
    tracing::info!(component = "jobs", job_id = %id, "deleted job listing");
    Ok(())
}

fn first_job(rows: Vec<Value>) -> AppResult<Job> {
    let row = rows.into_iter().next().ok_or_else(AppError::not_found)?;
    Ok(serde_json::from_value(row)?)
}
