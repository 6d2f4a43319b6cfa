//! The application context handed to every view.
//!
//! `AppContext` owns the session, the HTTP client and the query cache, and
//! exposes the named queries and mutations the views are built from.

use log::{info, warn};
use std::future::Future;
use std::sync::{Arc, Weak};

use crate::api::ApiClient;
use crate::auth::{
    AuthResponse, InactivityMonitor, LoginRequest, LogoutReason, RegisterRequest, Session,
    SessionStore,
};
use crate::cache::{QueryCache, QueryKey, QueryOptions, QueryScope};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{Notification, Task, TaskInput, TaskUpdate, User};
use crate::storage::{FileStorage, Storage};

pub struct AppContext {
    config: Config,
    session: Arc<SessionStore>,
    api: ApiClient,
    cache: QueryCache,
}

impl AppContext {
    /// Builds the context on top of an explicit storage backend.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Result<Arc<Self>, AppError> {
        let session = Arc::new(SessionStore::open(storage, config.session_ttl)?);
        let api = ApiClient::new(&config, session.clone())?;
        Ok(Arc::new(Self {
            config,
            session,
            api,
            cache: QueryCache::new(),
        }))
    }

    /// Builds the context with file storage under `config.storage_dir`.
    pub fn from_config(config: Config) -> Result<Arc<Self>, AppError> {
        let storage = FileStorage::open(&config.storage_dir)?;
        Self::new(config, Arc::new(storage))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn query_options(&self) -> QueryOptions {
        QueryOptions::new(self.config.query_retries, self.config.stale_time)
    }

    // Queries

    /// The logged-in user. Never retried: a failure here usually means the
    /// credential is no longer accepted.
    pub async fn current_user(&self) -> Result<User, AppError> {
        let options = self.query_options().without_retry();
        self.authenticated(self.cache.fetch(QueryKey::CurrentUser, options, || self.api.me()))
            .await
    }

    pub async fn users(&self) -> Result<Vec<User>, AppError> {
        let options = self.query_options();
        self.authenticated(self.cache.fetch(QueryKey::Users, options, || self.api.users()))
            .await
    }

    pub async fn tasks(&self) -> Result<Vec<Task>, AppError> {
        let options = self.query_options();
        self.authenticated(self.cache.fetch(QueryKey::Tasks, options, || self.api.list_tasks()))
            .await
    }

    pub async fn task(&self, id: &str) -> Result<Task, AppError> {
        let options = self.query_options();
        let key = QueryKey::Task(id.to_string());
        self.authenticated(self.cache.fetch(key, options, || self.api.get_task(id)))
            .await
    }

    pub async fn notifications(&self, email: &str) -> Result<Vec<Notification>, AppError> {
        let options = self.query_options();
        let key = QueryKey::Notifications(email.to_string());
        self.authenticated(self.cache.fetch(key, options, || self.api.notifications(email)))
            .await
    }

    // Mutations

    /// Logs in and stores the returned token.
    ///
    /// Cached data from any previous session is dropped. The current user is
    /// seeded from the response when the API includes it.
    pub async fn login(&self, request: LoginRequest) -> Result<Session, AppError> {
        let response = self.api.login(&request).await?;
        self.start_session(response)?
            .ok_or_else(|| AppError::Unauthorized("Login response did not include a token".into()))
    }

    /// Registers a new account. When the API answers with a token the new user
    /// is logged in straight away.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        let response = self.api.register(&request).await?;
        self.cache.invalidate(&QueryKey::Users);
        self.start_session(response.clone())?;
        Ok(response)
    }

    pub async fn create_task(&self, input: TaskInput) -> Result<Task, AppError> {
        let task = self
            .authenticated(async { self.api.create_task(&input).await })
            .await?;
        self.cache.invalidate(&QueryKey::Tasks);
        Ok(task)
    }

    pub async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, AppError> {
        let task = self
            .authenticated(async { self.api.update_task(id, &update).await })
            .await?;
        self.cache.set(QueryKey::Task(task.id.clone()), &task)?;
        self.cache.invalidate(&QueryKey::Tasks);
        Ok(task)
    }

    /// Ends the session for `reason` and drops every cached query.
    pub fn logout(&self, reason: LogoutReason) -> Result<(), AppError> {
        self.cache.clear();
        self.session.logout(reason)
    }

    /// Starts the idle timer. When it fires the session is logged out with
    /// [`LogoutReason::Inactivity`].
    ///
    /// The monitor holds only a weak reference, so it never keeps the context alive.
    pub fn start_inactivity_monitor(self: &Arc<Self>) -> InactivityMonitor {
        let context: Weak<Self> = Arc::downgrade(self);
        InactivityMonitor::spawn(self.config.idle_timeout, move || {
            if let Some(context) = context.upgrade() {
                if let Err(e) = context.logout(LogoutReason::Inactivity) {
                    warn!("Failed to clear session after inactivity: {}", e);
                }
            }
        })
    }

    fn start_session(&self, response: AuthResponse) -> Result<Option<Session>, AppError> {
        let Some(token) = response.token else {
            return Ok(None);
        };
        self.cache.clear();
        let session = self.session.login(&token)?;
        if let Some(user) = response.user {
            info!("Logged in as {}", user.email);
            self.cache.set(QueryKey::CurrentUser, &user)?;
        }
        Ok(Some(session))
    }

    /// Runs an authenticated call.
    ///
    /// Fails fast without a live session (logging out an expired one), and logs
    /// out when the API rejects the credential.
    async fn authenticated<T, F>(&self, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        if !self.session.is_authenticated() {
            if self.session.is_expired() {
                self.logout(LogoutReason::Expired)?;
                return Err(AppError::Unauthorized(
                    "Your session has expired. Please log in again.".into(),
                ));
            }
            return Err(AppError::Unauthorized("Please log in first.".into()));
        }

        match call.await {
            Err(e) if e.is_unauthorized() => {
                warn!("API rejected the session credential: {}", e);
                self.logout(LogoutReason::Unauthorized)?;
                Err(e)
            }
            other => other,
        }
    }

    /// Drops cached tasks so the next read goes to the API.
    pub fn refresh_tasks(&self) {
        self.cache.invalidate_scope(QueryScope::Tasks);
    }
}
