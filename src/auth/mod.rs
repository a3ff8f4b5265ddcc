pub mod jwt;

use std::fmt;

use serde_json::json;
use uuid::Uuid;

use crate::backend::{tables, BackendError, Query, Session};
use crate::dashboard::Page;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::models::{Role, UserProfile};
use crate::state::AppState;
use crate::utils::json::without_nulls;
use crate::validation::{limits, optional, required};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Bearer token of a signed-in user. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    token: AccessToken,
}

impl AuthenticatedUser {
    pub fn token(&self) -> &AccessToken {
        &self.token
    }
}

impl From<Session> for AuthenticatedUser {
    fn from(session: Session) -> Self {
        Self {
            user_id: session.user.id,
            email: session.user.email,
            token: session.access_token,
        }
    }
}

/// A signed-in user together with their profile row.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthenticatedUser,
    pub profile: UserProfile,
}

impl CurrentUser {
    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn into_hrd(self) -> AppResult<HrdUser> {
        match self.profile.role {
            Role::Hrd => Ok(HrdUser {
                user: self.user,
                profile: self.profile,
            }),
            other => Err(AppError::wrong_dashboard(other)),
        }
    }

    pub fn into_pelamar(self) -> AppResult<PelamarUser> {
        match self.profile.role {
            Role::Pelamar => Ok(PelamarUser {
                user: self.user,
                profile: self.profile,
            }),
            other => Err(AppError::wrong_dashboard(other)),
        }
    }
}

/// Proof that the caller is signed in with an employer account.
#[derive(Debug, Clone)]
pub struct HrdUser {
    user: AuthenticatedUser,
    profile: UserProfile,
}

impl HrdUser {
    pub fn user_id(&self) -> Uuid {
        self.user.user_id
    }

    pub fn token(&self) -> &AccessToken {
        self.user.token()
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn is_verified(&self) -> bool {
        self.profile.is_verified
    }

    /// Listing writes are reserved for verified employers.
    pub fn require_verified(&self) -> AppResult<()> {
        if self.profile.is_verified {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "your HRD account is waiting for verification",
            ))
        }
    }

    pub(crate) fn refresh(&mut self, profile: UserProfile) {
        self.profile = profile;
    }
}

/// Proof that the caller is signed in with a job-seeker account.
#[derive(Debug, Clone)]
pub struct PelamarUser {
    user: AuthenticatedUser,
    profile: UserProfile,
}

impl PelamarUser {
    pub fn user_id(&self) -> Uuid {
        self.user.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    pub fn token(&self) -> &AccessToken {
        self.user.token()
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub(crate) fn refresh(&mut self, profile: UserProfile) {
        self.profile = profile;
    }
}

#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub username: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub profile: UserProfile,
    /// Present unless the project requires email confirmation first.
    pub session: Option<CurrentUser>,
}

pub async fn register(state: &AppState, form: RegisterForm) -> AppResult<Registration> {
    let email = form.email.trim();
    if !email.contains('@') {
        return Err(AppError::bad_request("a valid email address is required"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let username = required("Username", &form.username, limits::USERNAME)?;
    let full_name = required("Full name", &form.full_name, limits::FULL_NAME)?;
    let phone = optional("Phone", form.phone.as_deref(), limits::PHONE)?;
    let company_name = match form.role {
        Role::Hrd => Some(required(
            "Company name",
            form.company_name.as_deref().unwrap_or_default(),
            limits::COMPANY_NAME,
        )?),
        Role::Pelamar => None,
    };

    let signup = state.auth.sign_up(email, &form.password).await?;
    let token = signup.session.as_ref().map(|session| &session.access_token);

    let row = json!({
        "id": signup.user.id,
        "username": username,
        "full_name": full_name,
        "phone": phone,
        "company_name": company_name,
        "role": form.role,
        "is_verified": form.role.verified_on_signup(),
    });
    let row = state
        .tables
        .insert(token, tables::USER_PROFILES, without_nulls(row))
        .await?;
    let profile: UserProfile = serde_json::from_value(row)?;

    tracing::info!(
        component = "auth",
        user_id = %profile.id,
        role = %profile.role,
        confirmed = signup.session.is_some(),
        "registered account"
    );

    let session = signup.session.map(|session| CurrentUser {
        user: AuthenticatedUser::from(session),
        profile: profile.clone(),
    });
    Ok(Registration { profile, session })
}

pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<CurrentUser> {
    let session = state
        .auth
        .sign_in(email.trim(), password)
        .await
        .map_err(|err| match err {
            BackendError::Unauthorized => {
                AppError::new(ErrorKind::NotAuthenticated, "invalid email or password")
                    .with_redirect(Page::Login)
            }
            other => other.into(),
        })?;
    let user = AuthenticatedUser::from(session);
    let profile = current_profile(state, &user).await?;
    tracing::info!(component = "auth", user_id = %user.user_id, role = %profile.role, "signed in");
    Ok(CurrentUser { user, profile })
}

/// Restores a session from a saved access token. Expired tokens are refused
/// before any request is made.
pub async fn resume(state: &AppState, token: &str) -> AppResult<CurrentUser> {
    let claims = jwt::decode_session(token.trim())?;
    let token = AccessToken::new(token.trim());
    let identity = state.auth.user(&token).await?;
    if identity.id != claims.sub {
        return Err(AppError::not_authenticated());
    }
    let user = AuthenticatedUser {
        user_id: identity.id,
        email: identity.email.or(claims.email),
        token,
    };
    let profile = current_profile(state, &user).await?;
    Ok(CurrentUser { user, profile })
}

pub async fn logout(state: &AppState, user: &AuthenticatedUser) -> AppResult<()> {
    state.auth.sign_out(user.token()).await?;
    tracing::info!(component = "auth", user_id = %user.user_id, "signed out");
    Ok(())
}

pub async fn current_profile(state: &AppState, user: &AuthenticatedUser) -> AppResult<UserProfile> {
    fetch_profile(state, user.token(), user.user_id).await
}

pub(crate) async fn fetch_profile(
    state: &AppState,
    token: &AccessToken,
    user_id: Uuid,
) -> AppResult<UserProfile> {
    let query = Query::table(tables::USER_PROFILES).eq("id", user_id).limit(1);
    let row = state
        .tables
        .select(Some(token), &query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            tracing::warn!(component = "auth", %user_id, "signed-in user has no profile");
            AppError::new(ErrorKind::NotFound, "profile not found").with_redirect(Page::Home)
        })?;
    Ok(serde_json::from_value(row)?)
}
