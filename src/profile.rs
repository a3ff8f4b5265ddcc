use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::auth::{self, HrdUser, PelamarUser};
use crate::avatar::avatar_url;
use crate::backend::{tables, Query};
use crate::bio::CompanyBio;
use crate::error::{AppError, AppResult};
use crate::models::UserProfile;
use crate::state::AppState;
use crate::utils::json::from_rows;
use crate::validation::{limits, optional, required};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonalForm {
    pub full_name: String,
    pub username: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub full_name: String,
    pub username: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyInfoForm {
    pub company_name: String,
    pub address: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
}

/// What the company page shows, with the bio already decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyProfile {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub about: Option<String>,
    pub vision: Option<String>,
    pub mission: Option<String>,
    pub is_verified: bool,
    pub avatar_url: String,
}

pub fn company_profile(profile: &UserProfile, avatar_base: &str) -> CompanyProfile {
    let bio = CompanyBio::decode(profile.bio.as_deref());
    let avatar_name = profile
        .company_name
        .as_deref()
        .unwrap_or_else(|| profile.display_name());
    CompanyProfile {
        company_name: profile.company_name.clone(),
        contact_name: profile.full_name.clone(),
        phone: profile.phone.clone(),
        address: profile.address.clone(),
        website: profile.portfolio_url.clone(),
        linkedin_url: profile.linkedin_url.clone(),
        industry: bio.metadata.industry.clone(),
        size: bio.metadata.size.clone(),
        about: bio.about().map(str::to_string),
        vision: bio.vision().map(str::to_string),
        mission: bio.mission().map(str::to_string),
        is_verified: profile.is_verified,
        avatar_url: avatar_url(avatar_base, avatar_name),
    }
}

fn filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn percent(done: usize, total: usize) -> u8 {
    ((done * 100 + total / 2) / total) as u8
}

/// Share of the five key job-seeker fields that are filled in.
pub fn profile_strength(profile: &UserProfile, email: Option<&str>) -> u8 {
    let checks = [
        filled(profile.full_name.as_deref()),
        filled(email),
        filled(profile.phone.as_deref()),
        filled(profile.address.as_deref()),
        filled(profile.bio.as_deref()),
    ];
    percent(checks.iter().filter(|c| **c).count(), checks.len())
}

/// Share of the seven company-profile items that are complete.
pub fn company_completeness(profile: &UserProfile) -> u8 {
    let checks = [
        filled(profile.company_name.as_deref()),
        filled(profile.full_name.as_deref()),
        filled(profile.phone.as_deref()),
        filled(profile.address.as_deref()),
        filled(profile.bio.as_deref()),
        filled(profile.linkedin_url.as_deref()) || filled(profile.portfolio_url.as_deref()),
        profile.is_verified,
    ];
    percent(checks.iter().filter(|c| **c).count(), checks.len())
}

async fn patch_profile(
    state: &AppState,
    token: &auth::AccessToken,
    query: Query,
    mut patch: Map<String, Value>,
) -> AppResult<Option<UserProfile>> {
    patch.insert("updated_at".into(), json!(Utc::now()));
    let rows = state
        .tables
        .update(Some(token), &query, Value::Object(patch))
        .await?;
    Ok(from_rows(rows)?.into_iter().next())
}

fn profile_query(user_id: uuid::Uuid) -> Query {
    Query::table(tables::USER_PROFILES).eq("id", user_id)
}

pub async fn update_personal(
    state: &AppState,
    pelamar: &mut PelamarUser,
    form: &PersonalForm,
) -> AppResult<UserProfile> {
    let mut patch = Map::new();
    patch.insert("full_name".into(), json!(required("Full name", &form.full_name, limits::FULL_NAME)?));
    patch.insert("username".into(), json!(required("Username", &form.username, limits::USERNAME)?));
    patch.insert("phone".into(), json!(optional("Phone", form.phone.as_deref(), limits::PHONE)?));
    patch.insert("address".into(), json!(optional("Address", form.address.as_deref(), limits::ADDRESS)?));
    patch.insert("bio".into(), json!(optional("Summary", form.bio.as_deref(), limits::BIO)?));
    patch.insert(
        "linkedin_url".into(),
        json!(optional("LinkedIn URL", form.linkedin_url.as_deref(), limits::URL)?),
    );
    patch.insert(
        "portfolio_url".into(),
        json!(optional("Portfolio URL", form.portfolio_url.as_deref(), limits::URL)?),
    );

    let profile = patch_profile(state, pelamar.token(), profile_query(pelamar.user_id()), patch)
        .await?
        .ok_or_else(AppError::not_found)?;
    tracing::info!(component = "profile", user_id = %pelamar.user_id(), "updated personal profile");
    pelamar.refresh(profile.clone());
    Ok(profile)
}

pub async fn update_contact(
    state: &AppState,
    hrd: &mut HrdUser,
    form: &ContactForm,
) -> AppResult<UserProfile> {
    let mut patch = Map::new();
    patch.insert("full_name".into(), json!(required("Full name", &form.full_name, limits::FULL_NAME)?));
    patch.insert("username".into(), json!(required("Username", &form.username, limits::USERNAME)?));
    patch.insert("phone".into(), json!(optional("Phone", form.phone.as_deref(), limits::PHONE)?));

    let profile = patch_profile(state, hrd.token(), profile_query(hrd.user_id()), patch)
        .await?
        .ok_or_else(AppError::not_found)?;
    tracing::info!(component = "profile", user_id = %hrd.user_id(), "updated HRD contact details");
    hrd.refresh(profile.clone());
    Ok(profile)
}

/// Re-reads the bio, applies `edit`, and writes it back only if nobody
/// changed the profile in between. `columns` are written in the same update.
///
/// The guard is `updated_at`, which every profile write sets. Rows that were
/// never edited have none, and fall back to comparing the bio itself.
async fn edit_bio<F>(
    state: &AppState,
    hrd: &mut HrdUser,
    edit: F,
    mut columns: Map<String, Value>,
) -> AppResult<UserProfile>
where
    F: FnOnce(CompanyBio) -> AppResult<CompanyBio>,
{
    let current = auth::fetch_profile(state, hrd.token(), hrd.user_id()).await?;
    let bio = edit(CompanyBio::decode(current.bio.as_deref()))?;
    columns.insert("bio".into(), json!(bio.encode()));

    let query = match (&current.updated_at, &current.bio) {
        (Some(updated_at), _) => profile_query(hrd.user_id())
            .eq("updated_at", updated_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        (None, Some(previous)) => profile_query(hrd.user_id()).eq("bio", previous),
        (None, None) => profile_query(hrd.user_id()).is_null("bio"),
    };
    let profile = patch_profile(state, hrd.token(), query, columns)
        .await?
        .ok_or_else(|| {
            tracing::warn!(component = "profile", user_id = %hrd.user_id(), "company bio changed during edit");
            AppError::conflict("the company profile was changed elsewhere; reload and try again")
        })?;
    hrd.refresh(profile.clone());
    Ok(profile)
}

pub async fn save_company_info(
    state: &AppState,
    hrd: &mut HrdUser,
    form: &CompanyInfoForm,
) -> AppResult<UserProfile> {
    let mut columns = Map::new();
    columns.insert(
        "company_name".into(),
        json!(required("Company name", &form.company_name, limits::COMPANY_NAME)?),
    );
    columns.insert("address".into(), json!(optional("Address", form.address.as_deref(), limits::ADDRESS)?));
    columns.insert(
        "portfolio_url".into(),
        json!(optional("Website", form.website.as_deref(), limits::URL)?),
    );
    columns.insert(
        "linkedin_url".into(),
        json!(optional("LinkedIn URL", form.linkedin_url.as_deref(), limits::URL)?),
    );

    let profile = edit_bio(
        state,
        hrd,
        |bio| bio.with_metadata(form.industry.as_deref(), form.size.as_deref()),
        columns,
    )
    .await?;
    tracing::info!(component = "profile", user_id = %profile.id, "saved company information");
    Ok(profile)
}

/// Clears the company name, contact columns and company metadata.
pub async fn delete_company_info(state: &AppState, hrd: &mut HrdUser) -> AppResult<UserProfile> {
    let mut columns = Map::new();
    for column in ["company_name", "address", "portfolio_url", "linkedin_url"] {
        columns.insert(column.into(), Value::Null);
    }
    let profile = edit_bio(state, hrd, |bio| Ok(bio.without_metadata()), columns).await?;
    tracing::info!(component = "profile", user_id = %profile.id, "deleted company information");
    Ok(profile)
}

pub async fn save_company_about(state: &AppState, hrd: &mut HrdUser, about: &str) -> AppResult<UserProfile> {
    edit_bio(state, hrd, |bio| bio.with_about(about), Map::new()).await
}

pub async fn delete_company_about(state: &AppState, hrd: &mut HrdUser) -> AppResult<UserProfile> {
    edit_bio(state, hrd, |bio| Ok(bio.without_about()), Map::new()).await
}

pub async fn save_vision_mission(
    state: &AppState,
    hrd: &mut HrdUser,
    vision: Option<&str>,
    mission: Option<&str>,
) -> AppResult<UserProfile> {
    edit_bio(state, hrd, |bio| bio.with_vision_mission(vision, mission), Map::new()).await
}

pub async fn delete_vision_mission(state: &AppState, hrd: &mut HrdUser) -> AppResult<UserProfile> {
    edit_bio(state, hrd, |bio| Ok(bio.without_vision_mission()), Map::new()).await
}
