use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::services::Dashboard;

/// The authenticated identity, passed explicitly into every gateway call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
}

impl Session {
    /// Local part of the email address, used to greet the learner.
    pub fn greeting_name(&self) -> String {
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("learner")
            .to_string()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user_id: String,
    pub email: Option<String>,
    pub greeting_name: String,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
            greeting_name: session.greeting_name(),
        }
    }
}

/// Holds the current session and notifies subscribers on sign-in/sign-out.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn sign_in(&self, session: Session) {
        info!("signed in as {}", session.user_id);
        self.tx.send_replace(Some(session));
    }

    pub fn sign_out(&self) -> Option<Session> {
        let previous = self.tx.send_replace(None);
        if let Some(session) = &previous {
            info!("signed out {}", session.user_id);
        }
        previous
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Opens a dashboard scope whenever a session appears and closes it when the
/// session goes away.
pub fn spawn_session_listener(store: &SessionStore, dashboard: Arc<Dashboard>) -> JoinHandle<()> {
    let mut rx = store.subscribe();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let current = rx.borrow_and_update().clone();
            match current {
                Some(session) => {
                    if let Err(e) = dashboard.scope_for(&session).await {
                        warn!("initial load for {} failed: {}", session.user_id, e);
                    }
                }
                None => dashboard.close().await,
            }
        }
    })
}
