use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{self, AtomicBool, AtomicI64};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, SecondsFormat, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use jobboard::auth::{self, AccessToken, CurrentUser, HrdUser, PelamarUser, RegisterForm};
use jobboard::backend::{
    tables, AuthProvider, AuthUser, BackendError, BackendResult, Direction, Filter, Order, Query, Session,
    SignUpResult, TableStore,
};
use jobboard::config::AppConfig;
use jobboard::jobs::{self, JobForm};
use jobboard::models::{Job, Role};
use jobboard::state::AppState;
use jobboard::storage::ObjectStorage;
use jobboard::validation::UploadFile;

#[allow(dead_code)]
pub const PASSWORD: &str = "rahasia123";

const JWT_SECRET: &[u8] = b"fake-project-jwt-secret";

type Row = Map<String, Value>;

#[derive(Serialize)]
struct FakeClaims {
    sub: Uuid,
    email: Option<String>,
    role: String,
    exp: usize,
    session_id: Uuid,
}

struct Account {
    id: Uuid,
    password: String,
}

#[derive(Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, AuthUser>,
}

/// In-memory stand-in for the hosted auth service and table API.
#[derive(Default)]
pub struct FakeBackend {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    auth: Mutex<AuthState>,
    clock: AtomicI64,
    require_confirmation: AtomicBool,
    failing_insert: Mutex<Option<String>>,
    interference: Mutex<Option<(String, String, Value)>>,
    last_update: Mutex<Option<Query>>,
}

fn cell(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => cell(row, column).as_deref() == Some(value.as_str()),
        Filter::ILike(column, needle) => cell(row, column)
            .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
        Filter::In(column, values) => cell(row, column).is_some_and(|text| values.contains(&text)),
        Filter::IsNull(column) => cell(row, column).is_none(),
        Filter::Or(filters) => filters.iter().any(|f| matches(row, f)),
    }
}

fn matches_all(row: &Row, query: &Query) -> bool {
    query.filters.iter().all(|f| matches(row, f))
}

/// Postgres placement: nulls last when ascending, first when descending,
/// unless the order says otherwise.
fn compare(a: &Row, b: &Row, order: &Order) -> Ordering {
    let a = a.get(&order.column).filter(|v| !v.is_null());
    let b = b.get(&order.column).filter(|v| !v.is_null());
    let null = if order.nulls_first() {
        Ordering::Greater
    } else {
        Ordering::Less
    };
    let ordering = match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (Some(_), None) => return null,
        (None, Some(_)) => return null.reverse(),
        (None, None) => return Ordering::Equal,
    };
    match order.direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

fn project(row: &Row, columns: &str) -> Value {
    if columns.trim() == "*" {
        return Value::Object(row.clone());
    }
    Value::Object(
        columns
            .split(',')
            .map(str::trim)
            .filter_map(|column| row.get(column).map(|v| (column.to_string(), v.clone())))
            .collect(),
    )
}

fn column_defaults(table: &str) -> Vec<(&'static str, Value)> {
    match table {
        tables::JOBS => vec![("is_active", json!(true))],
        tables::APPLICATIONS => vec![("status", json!("Pending"))],
        tables::USER_PROFILES => vec![("is_verified", json!(false))],
        tables::CAREER_HISTORY | tables::EDUCATION => vec![("is_current", json!(false))],
        _ => Vec::new(),
    }
}

fn unique_violation(table: &str, existing: &[Row], row: &Row) -> Option<&'static str> {
    let same = |columns: &[&str]| {
        existing
            .iter()
            .any(|other| columns.iter().all(|c| cell(other, c).is_some() && cell(other, c) == cell(row, c)))
    };
    match table {
        tables::APPLICATIONS if same(&["job_id", "user_id"]) => Some("applications_job_id_user_id_key"),
        _ if same(&["id"]) => Some("pkey"),
        _ => None,
    }
}

impl FakeBackend {
    /// Sign-ups return no session until the account is confirmed.
    #[allow(dead_code)]
    pub fn require_email_confirmation(&self, required: bool) {
        self.require_confirmation.store(required, atomic::Ordering::SeqCst);
    }

    /// Makes the next insert into `table` fail with a server error.
    #[allow(dead_code)]
    pub async fn fail_next_insert(&self, table: &str) {
        *self.failing_insert.lock().await = Some(table.to_string());
    }

    /// Simulates another writer: right before the next update on `table`,
    /// `column` of the targeted rows is overwritten with `value`.
    #[allow(dead_code)]
    /// Simulates another session saving the row just before the next update:
    /// the column changes and `updated_at` moves on.
    pub async fn interfere_next_update(&self, table: &str, column: &str, value: Value) {
        *self.interference.lock().await = Some((table.to_string(), column.to_string(), value));
    }

    #[allow(dead_code)]
    pub async fn last_update(&self) -> Option<Query> {
        self.last_update.lock().await.clone()
    }

    #[allow(dead_code)]
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        let guard = self.tables.lock().await;
        guard
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Writes a column directly, bypassing every check.
    #[allow(dead_code)]
    pub async fn set_column(&self, table: &str, id: Uuid, column: &str, value: Value) -> Result<()> {
        let mut guard = self.tables.lock().await;
        let row = guard
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| cell(row, "id") == Some(id.to_string())))
            .ok_or_else(|| anyhow!("{table} row {id} missing"))?;
        row.insert(column.to_string(), value);
        Ok(())
    }

    #[allow(dead_code)]
    pub fn expired_token(&self, user_id: Uuid) -> Result<String> {
        let claims = FakeClaims {
            sub: user_id,
            email: None,
            role: "authenticated".into(),
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
            session_id: Uuid::new_v4(),
        };
        Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET))?)
    }

    fn next_timestamp(&self) -> String {
        let tick = self.clock.fetch_add(1, atomic::Ordering::SeqCst);
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).single().unwrap_or_else(Utc::now);
        (base + Duration::seconds(tick)).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    async fn check(&self, token: Option<&AccessToken>) -> BackendResult<()> {
        let Some(token) = token else {
            return Ok(());
        };
        if self.auth.lock().await.sessions.contains_key(token.as_str()) {
            Ok(())
        } else {
            Err(BackendError::Unauthorized)
        }
    }

    fn issue(auth: &mut AuthState, user: &AuthUser) -> BackendResult<Session> {
        let claims = FakeClaims {
            sub: user.id,
            email: user.email.clone(),
            role: "authenticated".into(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
            session_id: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET))
            .map_err(|err| BackendError::Remote {
                status: 500,
                code: None,
                message: err.to_string(),
            })?;
        auth.sessions.insert(token.clone(), user.clone());
        Ok(Session {
            access_token: AccessToken::new(token),
            user: user.clone(),
        })
    }
}

#[async_trait]
impl TableStore for FakeBackend {
    async fn select(&self, token: Option<&AccessToken>, query: &Query) -> BackendResult<Vec<Value>> {
        self.check(token).await?;
        let guard = self.tables.lock().await;
        let mut rows: Vec<&Row> = guard
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| matches_all(row, query)).collect())
            .unwrap_or_default();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| compare(a, b, order));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows.into_iter().map(|row| project(row, &query.columns)).collect())
    }

    async fn insert(&self, token: Option<&AccessToken>, table: &str, row: Value) -> BackendResult<Value> {
        self.check(token).await?;
        {
            let mut failing = self.failing_insert.lock().await;
            if failing.as_deref() == Some(table) {
                *failing = None;
                return Err(BackendError::Remote {
                    status: 500,
                    code: None,
                    message: "simulated insert failure".into(),
                });
            }
        }
        let Value::Object(mut row) = row else {
            return Err(BackendError::Remote {
                status: 400,
                code: Some("PGRST102".into()),
                message: "expected a JSON object".into(),
            });
        };
        row.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
        row.entry("created_at").or_insert_with(|| json!(self.next_timestamp()));
        for (column, value) in column_defaults(table) {
            row.entry(column).or_insert(value);
        }

        let mut guard = self.tables.lock().await;
        let rows = guard.entry(table.to_string()).or_default();
        if let Some(constraint) = unique_violation(table, rows, &row) {
            return Err(BackendError::Conflict(format!(
                "duplicate key value violates unique constraint \"{constraint}\""
            )));
        }
        rows.push(row.clone());
        Ok(Value::Object(row))
    }

    async fn update(&self, token: Option<&AccessToken>, query: &Query, patch: Value) -> BackendResult<Vec<Value>> {
        self.check(token).await?;
        let patch = match patch {
            Value::Object(patch) => patch,
            _ => Row::new(),
        };
        let interference = {
            let mut slot = self.interference.lock().await;
            let targeted = slot.as_ref().is_some_and(|(table, _, _)| *table == query.table);
            if targeted {
                slot.take()
            } else {
                None
            }
        };
        *self.last_update.lock().await = Some(query.clone());
        let mut guard = self.tables.lock().await;
        let mut updated = Vec::new();
        if let Some(rows) = guard.get_mut(&query.table) {
            if let Some((_, column, value)) = interference {
                let ids: Vec<&String> = query
                    .filters
                    .iter()
                    .filter_map(|f| match f {
                        Filter::Eq(c, id) if c == "id" => Some(id),
                        _ => None,
                    })
                    .collect();
                let stamp = json!(self.next_timestamp());
                for row in rows.iter_mut() {
                    if cell(row, "id").is_some_and(|id| ids.contains(&&id)) {
                        row.insert(column.clone(), value.clone());
                        row.insert("updated_at".to_string(), stamp.clone());
                    }
                }
            }
            for row in rows.iter_mut().filter(|row| matches_all(row, query)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(Value::Object(row.clone()));
            }
        }
        Ok(updated)
    }

    async fn delete(&self, token: Option<&AccessToken>, query: &Query) -> BackendResult<Vec<Value>> {
        self.check(token).await?;
        let mut guard = self.tables.lock().await;
        let Some(rows) = guard.get_mut(&query.table) else {
            return Ok(Vec::new());
        };
        let (deleted, kept): (Vec<Row>, Vec<Row>) =
            rows.drain(..).partition(|row| matches_all(row, query));
        *rows = kept;
        Ok(deleted.into_iter().map(Value::Object).collect())
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpResult> {
        let mut auth = self.auth.lock().await;
        if auth.accounts.contains_key(email) {
            return Err(BackendError::Conflict("User already registered".into()));
        }
        let id = Uuid::new_v4();
        auth.accounts.insert(
            email.to_string(),
            Account {
                id,
                password: password.to_string(),
            },
        );
        let user = AuthUser {
            id,
            email: Some(email.to_string()),
        };
        let session = if self.require_confirmation.load(atomic::Ordering::SeqCst) {
            None
        } else {
            Some(Self::issue(&mut auth, &user)?)
        };
        Ok(SignUpResult { user, session })
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let mut auth = self.auth.lock().await;
        let user = match auth.accounts.get(email) {
            Some(account) if account.password == password => AuthUser {
                id: account.id,
                email: Some(email.to_string()),
            },
            _ => return Err(BackendError::Unauthorized),
        };
        Self::issue(&mut auth, &user)
    }

    async fn sign_out(&self, token: &AccessToken) -> BackendResult<()> {
        self.auth.lock().await.sessions.remove(token.as_str());
        Ok(())
    }

    async fn user(&self, token: &AccessToken) -> BackendResult<AuthUser> {
        self.auth
            .lock()
            .await
            .sessions
            .get(token.as_str())
            .cloned()
            .ok_or(BackendError::Unauthorized)
    }
}

#[allow(dead_code)]
#[derive(Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(
        &self,
        _token: Option<&AccessToken>,
        key: &str,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> Result<()> {
        let stored = StoredObject {
            key: key.to_string(),
            bytes,
            content_type,
        };
        let mut guard = self.objects.lock().await;
        guard.insert(stored.key.clone(), stored);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://fake-storage/public/{key}")
    }

    async fn delete_object(&self, _token: Option<&AccessToken>, key: &str) -> Result<()> {
        let mut guard = self.objects.lock().await;
        guard.remove(key);
        Ok(())
    }
}

impl FakeStorage {
    #[allow(dead_code)]
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        let guard = self.objects.lock().await;
        guard.get(key).cloned()
    }

    #[allow(dead_code)]
    pub async fn object_count(&self) -> usize {
        let guard = self.objects.lock().await;
        guard.len()
    }

    /// The stored object behind a URL handed out by `public_url`.
    #[allow(dead_code)]
    pub async fn get_by_url(&self, url: &str) -> Option<StoredObject> {
        let key = url.strip_prefix("https://fake-storage/public/")?;
        self.get(key).await
    }
}

pub struct TestApp {
    pub state: AppState,
    pub backend: Arc<FakeBackend>,
    pub storage: Arc<FakeStorage>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::new("http://localhost:54321", "test-anon-key")?;
        let backend = Arc::new(FakeBackend::default());
        let storage = Arc::new(FakeStorage::default());
        let state = AppState::new(config, backend.clone(), backend.clone(), storage.clone());
        Ok(Self {
            state,
            backend,
            storage,
        })
    }

    pub fn register_form(role: Role, email: &str) -> RegisterForm {
        let username = email.split('@').next().unwrap_or("user").to_string();
        RegisterForm {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            role,
            username,
            full_name: "Budi Santoso".to_string(),
            phone: None,
            company_name: matches!(role, Role::Hrd).then(|| "PT Maju Bersama".to_string()),
        }
    }

    /// Registers a fresh account and returns its signed-in session.
    pub async fn register(&self, role: Role) -> Result<CurrentUser> {
        let email = format!("{}@example.com", &Uuid::new_v4().simple().to_string()[..12]);
        let registration = auth::register(&self.state, Self::register_form(role, &email)).await?;
        registration
            .session
            .context("registration returned no session")
    }

    pub async fn set_verified(&self, user_id: Uuid, verified: bool) -> Result<()> {
        self.backend
            .set_column(tables::USER_PROFILES, user_id, "is_verified", json!(verified))
            .await
    }

    /// Re-reads the profile behind a session, as a new sign-in would.
    pub async fn reload(&self, current: &CurrentUser) -> Result<CurrentUser> {
        Ok(auth::resume(&self.state, current.user.token().as_str()).await?)
    }

    pub async fn reload_hrd(&self, hrd: &HrdUser) -> Result<HrdUser> {
        Ok(auth::resume(&self.state, hrd.token().as_str()).await?.into_hrd()?)
    }

    pub async fn hrd(&self, verified: bool) -> Result<HrdUser> {
        let current = self.register(Role::Hrd).await?;
        if verified {
            self.set_verified(current.user.user_id, true).await?;
        }
        Ok(self.reload(&current).await?.into_hrd()?)
    }

    pub async fn pelamar(&self) -> Result<PelamarUser> {
        Ok(self.register(Role::Pelamar).await?.into_pelamar()?)
    }

    pub fn job_form(title: &str) -> JobForm {
        JobForm {
            title: title.to_string(),
            company: "PT Maju Bersama".to_string(),
            description: "Membangun layanan backend.".to_string(),
            requirements: "Pengalaman 2 tahun.".to_string(),
            location: Some("Jakarta".to_string()),
            category: Some("IT".to_string()),
            salary_min: Some(8_000_000),
            salary_max: Some(12_000_000),
            employment_type: None,
        }
    }

    pub async fn post_job(&self, hrd: &HrdUser, title: &str) -> Result<Job> {
        Ok(jobs::create(&self.state, hrd, &Self::job_form(title)).await?)
    }

    /// A PDF upload of `size` bytes.
    pub fn pdf(name: &str, size: usize) -> UploadFile {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.resize(size.max(bytes.len()), b'0');
        UploadFile::new(name, Some("application/pdf".to_string()), bytes)
    }
}
