//! In-memory secret backend for testing.
//!
//! Secrets live in a `BTreeMap` keyed by alias behind a `RwLock`, so listings
//! come back in alias order. Nothing is encrypted or persisted. Every call
//! made through [`SecretBackend`] is recorded, and individual operations can
//! be made to fail, so tests can observe exactly what reached the backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;

use crate::{
    DecryptedSecret, HealthStatus, ListQuery, NewSecret, Secret, SecretBackend, SecretPage,
    VaultError,
};

/// A call observed by the [`MemoryBackend`], with its argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    SecretByAlias(String),
    SecretById(String),
    Decrypt(String),
    List(ListQuery),
    /// Carries the alias of the secret being created.
    Create(String),
    Health,
}

/// A failure to inject into one backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Behave like an unreachable or overloaded backend.
    Unavailable,
    /// Behave like a permission denial.
    Forbidden,
    /// Behave like a request that ran out of time.
    Timeout,
}

impl Fault {
    fn to_error(self) -> VaultError {
        match self {
            Self::Unavailable => VaultError::Unavailable("backend unavailable".to_owned()),
            Self::Forbidden => VaultError::Auth("permission denied".to_owned()),
            Self::Timeout => VaultError::Timeout,
        }
    }
}

/// Which operation a [`Fault`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    SecretByAlias,
    SecretById,
    Decrypt,
    List,
    Create,
    Health,
}

impl BackendCall {
    fn op(&self) -> BackendOp {
        match self {
            Self::SecretByAlias(_) => BackendOp::SecretByAlias,
            Self::SecretById(_) => BackendOp::SecretById,
            Self::Decrypt(_) => BackendOp::Decrypt,
            Self::List(_) => BackendOp::List,
            Self::Create(_) => BackendOp::Create,
            Self::Health => BackendOp::Health,
        }
    }
}

struct StoredSecret {
    secret: Secret,
    data: Map<String, Value>,
}

#[derive(Default)]
struct State {
    by_alias: BTreeMap<String, StoredSecret>,
    alias_by_id: HashMap<String, String>,
    calls: Vec<BackendCall>,
    faults: HashMap<BackendOp, Fault>,
}

impl State {
    fn by_id(&self, id: &str) -> Option<&StoredSecret> {
        self.alias_by_id
            .get(id)
            .and_then(|alias| self.by_alias.get(alias))
    }

    fn insert(&mut self, new: &NewSecret) -> Result<Secret, VaultError> {
        if new.alias.is_empty() {
            return Err(VaultError::Invalid("alias must not be empty".to_owned()));
        }
        if new.data.is_empty() {
            return Err(VaultError::Invalid("data must not be empty".to_owned()));
        }
        if self.by_alias.contains_key(&new.alias) {
            return Err(VaultError::Conflict(format!(
                "secret with alias '{}' already exists",
                new.alias
            )));
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let secret = Secret {
            id: uuid::Uuid::new_v4().to_string(),
            alias: new.alias.clone(),
            secret_type: new.secret_type,
            sub_type: new.sub_type,
            version: 1,
            tags: new.tags.clone(),
            file_name: None,
            expires_at: new.expires_at.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.alias_by_id
            .insert(secret.id.clone(), secret.alias.clone());
        self.by_alias.insert(
            secret.alias.clone(),
            StoredSecret {
                secret: secret.clone(),
                data: new.data.clone(),
            },
        );
        Ok(secret)
    }
}

/// An in-memory [`SecretBackend`].
///
/// Cloning is cheap and clones share state, so a test can keep one handle
/// for inspection while the code under test owns another.
///
/// # Examples
///
/// ```
/// # use znvault_client::{MemoryBackend, NewSecret, SecretBackend, SecretType};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// let mut data = serde_json::Map::new();
/// data.insert("password".into(), "hunter2".into());
/// let created = backend
///     .seed(NewSecret {
///         alias: "api/production/db".into(),
///         secret_type: SecretType::Credential,
///         sub_type: None,
///         data,
///         tags: vec![],
///         expires_at: None,
///     })
///     .await
///     .unwrap();
/// let found = backend.secret_by_alias("api/production/db").await.unwrap();
/// assert_eq!(found.id, created.id);
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<RwLock<State>>,
    started: Instant,
}

impl MemoryBackend {
    /// Create a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            started: Instant::now(),
        }
    }

    /// Store a secret without recording a call or applying faults.
    ///
    /// # Errors
    ///
    /// Same rules as [`SecretBackend::create`]: empty alias or data is
    /// [`VaultError::Invalid`], a taken alias is [`VaultError::Conflict`].
    #[allow(clippy::needless_pass_by_value)]
    pub async fn seed(&self, new: NewSecret) -> Result<Secret, VaultError> {
        self.state.write().await.insert(&new)
    }

    /// Calls received through [`SecretBackend`], oldest first.
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.read().await.calls.clone()
    }

    /// Forget recorded calls.
    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }

    /// Make every later call of `op` fail with `fault`.
    pub async fn fail(&self, op: BackendOp, fault: Fault) {
        self.state.write().await.faults.insert(op, fault);
    }

    /// Remove an injected fault.
    pub async fn recover(&self, op: BackendOp) {
        self.state.write().await.faults.remove(&op);
    }

    /// Record the call, then report the injected fault for its operation, if any.
    async fn record(&self, call: BackendCall) -> Result<(), VaultError> {
        let mut state = self.state.write().await;
        let fault = state.faults.get(&call.op()).copied();
        state.calls.push(call);
        fault.map_or(Ok(()), |f| Err(f.to_error()))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SecretBackend for MemoryBackend {
    async fn secret_by_alias(&self, alias: &str) -> Result<Secret, VaultError> {
        self.record(BackendCall::SecretByAlias(alias.to_owned()))
            .await?;
        let state = self.state.read().await;
        state
            .by_alias
            .get(alias)
            .map(|stored| stored.secret.clone())
            .ok_or_else(|| VaultError::NotFound {
                resource: alias.to_owned(),
            })
    }

    async fn secret_by_id(&self, id: &str) -> Result<Secret, VaultError> {
        self.record(BackendCall::SecretById(id.to_owned())).await?;
        let state = self.state.read().await;
        state
            .by_id(id)
            .map(|stored| stored.secret.clone())
            .ok_or_else(|| VaultError::NotFound {
                resource: id.to_owned(),
            })
    }

    async fn decrypt(&self, id: &str) -> Result<DecryptedSecret, VaultError> {
        self.record(BackendCall::Decrypt(id.to_owned())).await?;
        let state = self.state.read().await;
        state
            .by_id(id)
            .map(|stored| DecryptedSecret {
                secret: stored.secret.clone(),
                data: stored.data.clone(),
            })
            .ok_or_else(|| VaultError::NotFound {
                resource: id.to_owned(),
            })
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn list(&self, query: &ListQuery) -> Result<SecretPage, VaultError> {
        self.record(BackendCall::List(query.clone())).await?;
        let state = self.state.read().await;

        let prefix = query.alias_prefix.as_deref().unwrap_or("");
        let matching: Vec<&Secret> = state
            .by_alias
            .values()
            .map(|stored| &stored.secret)
            .filter(|s| query.secret_type.is_none_or(|t| s.secret_type == t))
            .filter(|s| s.alias.starts_with(prefix))
            .filter(|s| query.tags.iter().all(|tag| s.tags.contains(tag)))
            .collect();

        let page_size = query.page_size.max(1);
        let total = matching.len() as u64;
        let skip = (query.page.max(1) as usize - 1).saturating_mul(page_size as usize);
        let items = matching
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(SecretPage {
            total,
            page: query.page,
            page_size: query.page_size,
            total_pages: total.div_ceil(u64::from(page_size)),
            items,
        })
    }

    async fn create(&self, secret: &NewSecret) -> Result<Secret, VaultError> {
        self.record(BackendCall::Create(secret.alias.clone()))
            .await?;
        self.state.write().await.insert(secret)
    }

    async fn health(&self) -> Result<HealthStatus, VaultError> {
        self.record(BackendCall::Health).await?;
        let count = self.state.read().await.by_alias.len();
        Ok(HealthStatus {
            status: "ok".to_owned(),
            version: Some(env!("CARGO_PKG_VERSION").to_owned()),
            uptime: Some(self.started.elapsed().as_secs_f64()),
            timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            checks: json!({ "storage": { "status": "ok", "backend": "memory", "secrets": count } }),
        })
    }
}
