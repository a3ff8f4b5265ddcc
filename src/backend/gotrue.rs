use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{error_from_response, AuthProvider, AuthUser, BackendResult, Session, SignUpResult};
use crate::auth::AccessToken;
use crate::config::AppConfig;

/// [`AuthProvider`] backed by the project's `/auth/v1` endpoint.
#[derive(Clone)]
pub struct GoTrueClient {
    http: Client,
    base: Url,
    anon_key: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(value: TokenResponse) -> Self {
        Session {
            access_token: AccessToken::new(value.access_token),
            user: value.user,
        }
    }
}

impl GoTrueClient {
    pub fn new(http: Client, config: &AppConfig) -> BackendResult<Self> {
        Ok(Self {
            http,
            base: config.supabase_url.join("auth/v1/")?,
            anon_key: config.anon_key.clone(),
        })
    }

    fn post(&self, path: &str) -> BackendResult<RequestBuilder> {
        Ok(self
            .http
            .post(self.base.join(path)?)
            .header("apikey", &self.anon_key))
    }
}

async fn ensure_success(response: Response) -> BackendResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpResult> {
        let response = self
            .post("signup")?
            .json(&Credentials { email, password })
            .send()
            .await?;
        let body: Value = ensure_success(response).await?.json().await?;

        // With email confirmation enabled the body is the bare user object.
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)?;
            let session = Session::from(token);
            Ok(SignUpResult {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user: AuthUser = match body.get("user") {
                Some(user) => serde_json::from_value(user.clone())?,
                None => serde_json::from_value(body)?,
            };
            Ok(SignUpResult {
                user,
                session: None,
            })
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let response = self
            .post("token")?
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;
        let token: TokenResponse = ensure_success(response).await?.json().await?;
        Ok(token.into())
    }

    async fn sign_out(&self, token: &AccessToken) -> BackendResult<()> {
        let response = self.post("logout")?.bearer_auth(token.as_str()).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn user(&self, token: &AccessToken) -> BackendResult<AuthUser> {
        let response = self
            .http
            .get(self.base.join("user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.as_str())
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }
}
