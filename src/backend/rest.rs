use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use super::{error_from_response, BackendError, BackendResult, Query, TableStore};
use crate::auth::AccessToken;
use crate::config::AppConfig;

const RETURN_REPRESENTATION: &str = "return=representation";

/// [`TableStore`] backed by the project's `/rest/v1` endpoint.
#[derive(Clone)]
pub struct PostgrestClient {
    http: Client,
    base: Url,
    anon_key: String,
}

impl PostgrestClient {
    pub fn new(http: Client, config: &AppConfig) -> BackendResult<Self> {
        Ok(Self {
            http,
            base: config.supabase_url.join("rest/v1/")?,
            anon_key: config.anon_key.clone(),
        })
    }

    fn request(&self, method: Method, table: &str, token: Option<&AccessToken>) -> BackendResult<RequestBuilder> {
        let url = self.base.join(table)?;
        let bearer = token.map(AccessToken::as_str).unwrap_or(&self.anon_key);
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer))
    }
}

async fn read_rows(response: Response) -> BackendResult<Vec<Value>> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let body = response.bytes().await?;
    if body.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_slice(&body)? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

#[async_trait]
impl TableStore for PostgrestClient {
    async fn select(&self, token: Option<&AccessToken>, query: &Query) -> BackendResult<Vec<Value>> {
        let response = self
            .request(Method::GET, &query.table, token)?
            .query(&query.to_params())
            .send()
            .await?;
        read_rows(response).await
    }

    async fn insert(
        &self,
        token: Option<&AccessToken>,
        table: &str,
        row: Value,
    ) -> BackendResult<Value> {
        let response = self
            .request(Method::POST, table, token)?
            .query(&[("select", "*")])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row)
            .send()
            .await?;
        read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Remote {
                status: 201,
                code: None,
                message: format!("insert into {table} returned no row"),
            })
    }

    async fn update(
        &self,
        token: Option<&AccessToken>,
        query: &Query,
        patch: Value,
    ) -> BackendResult<Vec<Value>> {
        let response = self
            .request(Method::PATCH, &query.table, token)?
            .query(&query.to_params())
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch)
            .send()
            .await?;
        read_rows(response).await
    }

    async fn delete(&self, token: Option<&AccessToken>, query: &Query) -> BackendResult<Vec<Value>> {
        let response = self
            .request(Method::DELETE, &query.table, token)?
            .query(&query.to_params())
            .header("Prefer", RETURN_REPRESENTATION)
            .send()
            .await?;
        read_rows(response).await
    }
}
