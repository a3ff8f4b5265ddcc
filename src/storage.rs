use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Client;
use serde_json::json;
use url::Url;

use crate::auth::AccessToken;
use crate::backend::error_from_response;
use crate::config::AppConfig;

pub const CACHE_CONTROL: &str = "max-age=3600";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'?')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Uploads a new object. Existing keys are never overwritten.
    async fn put_object(
        &self,
        token: Option<&AccessToken>,
        key: &str,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> Result<()>;

    fn public_url(&self, key: &str) -> String;

    async fn delete_object(&self, token: Option<&AccessToken>, key: &str) -> Result<()>;
}

pub struct SupabaseStorage {
    http: Client,
    base: Url,
    anon_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(http: Client, config: &AppConfig) -> Result<Self> {
        Ok(Self {
            http,
            base: config
                .supabase_url
                .join("storage/v1/")
                .context("failed to build storage endpoint")?,
            anon_key: config.anon_key.clone(),
            bucket: config.storage_bucket.clone(),
        })
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        let path = format!("object/{}/{}", encode_segment(&self.bucket), encode_key(key));
        self.base
            .join(&path)
            .with_context(|| format!("invalid object key {key}"))
    }

    fn bearer<'a>(&'a self, token: Option<&'a AccessToken>) -> &'a str {
        token.map(AccessToken::as_str).unwrap_or(&self.anon_key)
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

fn encode_key(key: &str) -> String {
    key.split('/').map(encode_segment).collect::<Vec<_>>().join("/")
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn put_object(
        &self,
        token: Option<&AccessToken>,
        key: &str,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> Result<()> {
        let mut request = self
            .http
            .post(self.object_url(key)?)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(token))
            .header("cache-control", CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(bytes);

        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }

        let response = request
            .send()
            .await
            .context("failed to upload object to storage")?;
        if !response.status().is_success() {
            let err = error_from_response(response).await;
            return Err(anyhow::Error::new(err).context(format!("storage rejected upload of {key}")));
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}object/public/{}/{}",
            self.base,
            encode_segment(&self.bucket),
            encode_key(key)
        )
    }

    async fn delete_object(&self, token: Option<&AccessToken>, key: &str) -> Result<()> {
        let url = self
            .base
            .join(&format!("object/{}", encode_segment(&self.bucket)))
            .context("failed to build storage endpoint")?;
        let response = self
            .http
            .delete(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(token))
            .json(&json!({ "prefixes": [key] }))
            .send()
            .await
            .context("failed to delete object from storage")?;
        if !response.status().is_success() {
            let err = error_from_response(response).await;
            return Err(anyhow::Error::new(err).context(format!("storage rejected delete of {key}")));
        }
        Ok(())
    }
}
