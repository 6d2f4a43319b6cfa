//! Authentication state that survives restarts.
//!
//! The token is written to storage under [`TOKEN_KEY`] and a snapshot of the
//! whole [`Session`] under [`SNAPSHOT_KEY`]. The token key is authoritative:
//! without it, no snapshot is trusted.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::auth::token::token_expiration;
use crate::error::AppError;
use crate::storage::Storage;

pub const TOKEN_KEY: &str = "token";
pub const SNAPSHOT_KEY: &str = "persist:auth";
/// Where the user is sent after logging out.
pub const ENTRY_ROUTE: &str = "/login";

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_authenticated: bool,
    pub token: Option<String>,
    pub expiration_time: Option<DateTime<Utc>>,
}

impl Session {
    /// Builds an authenticated session for `token`.
    ///
    /// The expiry comes from the token's `exp` claim when readable, otherwise
    /// from `now + ttl`.
    pub fn for_token(
        token: &str,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<Self, AppError> {
        let expiration_time = match token_expiration(token) {
            Some(exp) => exp,
            None => fallback_expiry(now, ttl)?,
        };
        Ok(Self {
            is_authenticated: true,
            token: Some(token.to_string()),
            expiration_time: Some(expiration_time),
        })
    }

    /// A session is live only with a token, the flag set and the expiry in the future.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_authenticated
            && self.token.is_some()
            && self.expiration_time.map_or(true, |exp| now < exp)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some() && self.expiration_time.map_or(false, |exp| now >= exp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    Inactivity,
    Expired,
    /// The API rejected the stored credential.
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut {
        redirect_to: &'static str,
        reason: LogoutReason,
    },
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    state: RwLock<Session>,
    ttl: chrono::Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Opens the store and rehydrates whatever session `storage` holds.
    ///
    /// Stale or inconsistent persisted state is wiped.
    pub fn open(storage: Arc<dyn Storage>, ttl: std::time::Duration) -> Result<Self, AppError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Config(format!("Invalid session TTL: {}", e)))?;
        fallback_expiry(Utc::now(), ttl)?;
        let session = rehydrate(storage.as_ref(), Utc::now(), ttl)?;
        if session.is_authenticated {
            info!("Restored session expiring at {:?}", session.expiration_time);
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            storage,
            state: RwLock::new(session),
            ttl,
            events,
        })
    }

    /// Persists `token` and marks the session authenticated.
    ///
    /// A token that has already expired is rejected and nothing is stored.
    pub fn login(&self, token: &str) -> Result<Session, AppError> {
        let now = Utc::now();
        let session = Session::for_token(token, now, self.ttl)?;
        if !session.is_active_at(now) {
            warn!("Refusing a token that expired at {:?}", session.expiration_time);
            return Err(AppError::Unauthorized(
                "The server issued an expired session token".into(),
            ));
        }
        self.storage.set(TOKEN_KEY, token)?;
        self.storage
            .set(SNAPSHOT_KEY, &serde_json::to_string(&session)?)?;
        *self.write_state() = session.clone();

        info!("Logged in, session expires at {:?}", session.expiration_time);
        let _ = self.events.send(SessionEvent::LoggedIn);
        Ok(session)
    }

    /// Clears the token and snapshot, then tells subscribers to go to [`ENTRY_ROUTE`].
    ///
    /// The in-memory state is reset even if storage fails. Logging out with
    /// no session left to end does nothing and sends no event.
    pub fn logout(&self, reason: LogoutReason) -> Result<(), AppError> {
        let previous = std::mem::take(&mut *self.write_state());
        let persisted = !matches!(self.storage.get(TOKEN_KEY), Ok(None));
        if !previous.is_authenticated && !persisted {
            debug!("Already logged out, ignoring {:?} logout", reason);
            return Ok(());
        }
        let removed = self
            .storage
            .remove(TOKEN_KEY)
            .and_then(|_| self.storage.remove(SNAPSHOT_KEY));

        info!("Logged out ({:?})", reason);
        let _ = self.events.send(SessionEvent::LoggedOut {
            redirect_to: ENTRY_ROUTE,
            reason,
        });
        removed
    }

    pub fn current(&self) -> Session {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True only if the in-memory session is live and its token is still persisted.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        let session = self.current();
        if !session.is_active_at(now) {
            return false;
        }
        match self.storage.get(TOKEN_KEY) {
            Ok(stored) => stored.is_some() && stored == session.token,
            Err(e) => {
                warn!("Could not read persisted token: {}", e);
                false
            }
        }
    }

    pub fn is_expired(&self) -> bool {
        self.current().is_expired_at(Utc::now())
    }

    /// The bearer credential, read from persisted storage.
    pub fn token(&self) -> Result<Option<String>, AppError> {
        self.storage.get(TOKEN_KEY)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn fallback_expiry(now: DateTime<Utc>, ttl: chrono::Duration) -> Result<DateTime<Utc>, AppError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AppError::Config(format!("Session TTL of {} is out of range", ttl)))
}

fn rehydrate(
    storage: &dyn Storage,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> Result<Session, AppError> {
    let token = storage.get(TOKEN_KEY)?;
    let snapshot = match storage.get(SNAPSHOT_KEY)? {
        Some(raw) => match serde_json::from_str::<Session>(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Discarding unreadable session snapshot: {}", e);
                None
            }
        },
        None => None,
    };

    let Some(token) = token else {
        if snapshot.is_some() {
            storage.remove(SNAPSHOT_KEY)?;
        }
        return Ok(Session::default());
    };

    let session = match snapshot {
        Some(snapshot)
            if snapshot.is_authenticated && snapshot.token.as_deref() == Some(token.as_str()) =>
        {
            snapshot
        }
        _ => {
            let session = Session::for_token(&token, now, ttl)?;
            storage.set(SNAPSHOT_KEY, &serde_json::to_string(&session)?)?;
            session
        }
    };

    if !session.is_active_at(now) {
        info!("Stored session has expired, clearing it");
        storage.remove(TOKEN_KEY)?;
        storage.remove(SNAPSHOT_KEY)?;
        return Ok(Session::default());
    }
    Ok(session)
}
