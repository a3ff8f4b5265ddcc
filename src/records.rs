//! Career history, education and licenses: three owner-scoped tables with
//! the same list/create/update/delete shape.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::auth::PelamarUser;
use crate::backend::{tables, Direction, Query};
use crate::error::{AppError, AppResult, ErrorKind};
use crate::models::{CareerEntry, EducationEntry, LicenseEntry};
use crate::state::AppState;
use crate::utils::json::from_rows;
use crate::validation::{limits, optional, required};

pub trait RecordKind {
    type Entry: DeserializeOwned + Serialize;
    type Form;

    const TABLE: &'static str;
    const ORDER_COLUMN: &'static str;
    const LABEL: &'static str;

    /// Validated column values for an insert or update.
    fn to_row(form: &Self::Form) -> AppResult<Map<String, Value>>;
}

pub struct Career;
pub struct Education;
pub struct License;

#[derive(Debug, Clone)]
pub struct CareerForm {
    pub job_title: String,
    pub company_name: String,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EducationForm {
    pub institution_name: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LicenseForm {
    pub name: String,
    pub issuing_organization: String,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
}

/// An ongoing entry has no end date, whatever the form says.
fn period(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    is_current: bool,
) -> AppResult<Option<NaiveDate>> {
    if is_current {
        return Ok(None);
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::bad_request("end date must not be before start date"));
        }
    }
    Ok(end)
}

impl RecordKind for Career {
    type Entry = CareerEntry;
    type Form = CareerForm;

    const TABLE: &'static str = tables::CAREER_HISTORY;
    const ORDER_COLUMN: &'static str = "start_date";
    const LABEL: &'static str = "career entry";

    fn to_row(form: &CareerForm) -> AppResult<Map<String, Value>> {
        let end_date = period(Some(form.start_date), form.end_date, form.is_current)?;
        let mut row = Map::new();
        row.insert("job_title".into(), json!(required("Job title", &form.job_title, limits::CAREER_FIELD)?));
        row.insert(
            "company_name".into(),
            json!(required("Company", &form.company_name, limits::CAREER_FIELD)?),
        );
        row.insert(
            "location".into(),
            json!(optional("Location", form.location.as_deref(), limits::CAREER_FIELD)?),
        );
        row.insert("start_date".into(), json!(form.start_date));
        row.insert("end_date".into(), json!(end_date));
        row.insert("is_current".into(), json!(form.is_current));
        row.insert(
            "description".into(),
            json!(optional("Description", form.description.as_deref(), limits::CAREER_DESCRIPTION)?),
        );
        Ok(row)
    }
}

impl RecordKind for Education {
    type Entry = EducationEntry;
    type Form = EducationForm;

    const TABLE: &'static str = tables::EDUCATION;
    const ORDER_COLUMN: &'static str = "start_date";
    const LABEL: &'static str = "education entry";

    fn to_row(form: &EducationForm) -> AppResult<Map<String, Value>> {
        let end_date = period(form.start_date, form.end_date, form.is_current)?;
        let mut row = Map::new();
        row.insert(
            "institution_name".into(),
            json!(required("Institution", &form.institution_name, limits::INSTITUTION)?),
        );
        row.insert("degree".into(), json!(required("Degree", &form.degree, limits::DEGREE_FIELD)?));
        row.insert(
            "field_of_study".into(),
            json!(optional("Field of study", form.field_of_study.as_deref(), limits::DEGREE_FIELD)?),
        );
        row.insert("start_date".into(), json!(form.start_date));
        row.insert("end_date".into(), json!(end_date));
        row.insert("is_current".into(), json!(form.is_current));
        row.insert(
            "description".into(),
            json!(optional("Description", form.description.as_deref(), limits::EDUCATION_DESCRIPTION)?),
        );
        Ok(row)
    }
}

impl RecordKind for License {
    type Entry = LicenseEntry;
    type Form = LicenseForm;

    const TABLE: &'static str = tables::LICENSES;
    const ORDER_COLUMN: &'static str = "issue_date";
    const LABEL: &'static str = "license";

    fn to_row(form: &LicenseForm) -> AppResult<Map<String, Value>> {
        if let (Some(issued), Some(expires)) = (form.issue_date, form.expiry_date) {
            if expires < issued {
                return Err(AppError::bad_request("expiry date must not be before issue date"));
            }
        }
        let mut row = Map::new();
        row.insert("name".into(), json!(required("License name", &form.name, limits::LICENSE_NAME)?));
        row.insert(
            "issuing_organization".into(),
            json!(required("Issuing organization", &form.issuing_organization, limits::LICENSE_NAME)?),
        );
        row.insert("issue_date".into(), json!(form.issue_date));
        row.insert("expiry_date".into(), json!(form.expiry_date));
        row.insert(
            "credential_id".into(),
            json!(optional("Credential ID", form.credential_id.as_deref(), limits::CREDENTIAL_ID)?),
        );
        row.insert(
            "credential_url".into(),
            json!(optional("Credential URL", form.credential_url.as_deref(), limits::URL)?),
        );
        Ok(row)
    }
}

fn owned<K: RecordKind>(pelamar: &PelamarUser) -> Query {
    Query::table(K::TABLE).eq("user_id", pelamar.user_id())
}

fn first<K: RecordKind>(rows: Vec<Value>) -> AppResult<K::Entry> {
    from_rows::<K::Entry>(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::new(ErrorKind::NotFound, format!("{} not found", K::LABEL)))
}

/// The caller's entries, most recent first. Undated entries come last.
pub async fn list<K: RecordKind>(state: &AppState, pelamar: &PelamarUser) -> AppResult<Vec<K::Entry>> {
    let query = owned::<K>(pelamar)
        .order_by(K::ORDER_COLUMN, Direction::Desc)
        .nulls_last();
    let rows = state.tables.select(Some(pelamar.token()), &query).await?;
    Ok(from_rows(rows)?)
}

pub async fn create<K: RecordKind>(
    state: &AppState,
    pelamar: &PelamarUser,
    form: &K::Form,
) -> AppResult<K::Entry> {
    let mut row = K::to_row(form)?;
    row.insert("user_id".into(), json!(pelamar.user_id()));
    let row = state
        .tables
        .insert(Some(pelamar.token()), K::TABLE, Value::Object(row))
        .await?;
    tracing::info!(component = "records", table = K::TABLE, user_id = %pelamar.user_id(), "added profile entry");
    Ok(serde_json::from_value(row)?)
}

pub async fn update<K: RecordKind>(
    state: &AppState,
    pelamar: &PelamarUser,
    id: Uuid,
    form: &K::Form,
) -> AppResult<K::Entry> {
    let row = K::to_row(form)?;
    let query = owned::<K>(pelamar).eq("id", id);
    let rows = state
        .tables
        .update(Some(pelamar.token()), &query, Value::Object(row))
        .await?;
    let entry = first::<K>(rows)?;
    tracing::info!(component = "records", table = K::TABLE, entry_id = %id, "updated profile entry");
    Ok(entry)
}

pub async fn delete<K: RecordKind>(state: &AppState, pelamar: &PelamarUser, id: Uuid) -> AppResult<()> {
    let query = owned::<K>(pelamar).eq("id", id);
    let rows = state.tables.delete(Some(pelamar.token()), &query).await?;
    first::<K>(rows)?;
    tracing::info!(component = "records", table = K::TABLE, entry_id = %id, "deleted profile entry");
    Ok(())
}
