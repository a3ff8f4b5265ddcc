use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    backend::{AuthProvider, GoTrueClient, PostgrestClient, TableStore},
    config::AppConfig,
    storage::{ObjectStorage, SupabaseStorage},
};

/// Handles to the hosted backend, passed explicitly to every operation.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<dyn AuthProvider>,
    pub tables: Arc<dyn TableStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        auth: Arc<dyn AuthProvider>,
        tables: Arc<dyn TableStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            auth,
            tables,
            storage,
        }
    }

    /// Builds the REST clients for the configured project. Called once at
    /// startup; everything afterwards borrows the returned state.
    pub fn connect(config: AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("jobboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        let auth = GoTrueClient::new(http.clone(), &config).context("invalid auth endpoint")?;
        let tables = PostgrestClient::new(http.clone(), &config).context("invalid REST endpoint")?;
        let storage = SupabaseStorage::new(http, &config)?;

        tracing::info!(
            component = "state",
            project = %config.supabase_url,
            anon_key = %config.redacted_anon_key(),
            bucket = %config.storage_bucket,
            "connected backend clients"
        );

        Ok(Self::new(
            config,
            Arc::new(auth),
            Arc::new(tables),
            Arc::new(storage),
        ))
    }
}
