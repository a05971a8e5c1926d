use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::gateway::DashboardGateway;
use crate::models::{CompletionSet, Course, Module, Profile, ProfilePatch};
use crate::services::toggle::{MarkAllOutcome, ModuleToggleController, RemoteOp, ToggleOutcome};
use crate::services::with_timeout;
use crate::session::{Session, SessionStore};

/// In-memory copy of the remote tables for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub courses: Vec<Course>,
    pub modules: Vec<Module>,
    pub completions: CompletionSet,
    pub profile: Option<Profile>,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Failures from the most recent load, shown to the learner.
    pub load_errors: Vec<String>,
}

impl Snapshot {
    pub fn course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    pub fn course_modules(&self, course_id: &str) -> Vec<Module> {
        self.modules
            .iter()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect()
    }
}

/// Everything owned by one signed-in session. Once closed, no write-back
/// reaches the snapshot again.
pub struct SessionScope {
    id: Uuid,
    session: Session,
    snapshot: RwLock<Snapshot>,
    closed: AtomicBool,
    /// Bumped on every completion commit, under the snapshot write lock.
    completions_rev: AtomicU64,
    module_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    profile_writes: Mutex<()>,
}

impl SessionScope {
    fn new(session: Session) -> Self {
        Self {
            id: Uuid::new_v4(),
            session,
            snapshot: RwLock::new(Snapshot::default()),
            closed: AtomicBool::new(false),
            completions_rev: AtomicU64::new(0),
            module_locks: Mutex::new(HashMap::new()),
            profile_writes: Mutex::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn completions(&self) -> CompletionSet {
        self.snapshot.read().await.completions.clone()
    }

    pub async fn has_module(&self, module_id: &str) -> bool {
        self.snapshot.read().await.modules.iter().any(|m| m.id == module_id)
    }

    pub async fn course_modules(&self, course_id: &str) -> Result<Vec<Module>, AppError> {
        let snapshot = self.snapshot.read().await;
        if snapshot.course(course_id).is_none() {
            return Err(AppError::NotFound);
        }
        Ok(snapshot.course_modules(course_id))
    }

    /// Serializes writers per module. Locks are taken in sorted order so
    /// overlapping batches cannot deadlock.
    pub(crate) async fn lock_modules(&self, module_ids: &[String]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids: Vec<&String> = module_ids.iter().collect();
        ids.sort();
        ids.dedup();

        let locks: Vec<Arc<Mutex<()>>> = {
            let mut map = self.module_locks.lock().await;
            ids.into_iter()
                .map(|id| map.entry(id.clone()).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(locks.len());
        for lock in locks {
            guards.push(lock.lock_owned().await);
        }
        guards
    }

    /// Applies `update` unless the scope has been closed, in which case the
    /// result is discarded.
    async fn commit<F>(&self, update: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Snapshot),
    {
        let mut snapshot = self.snapshot.write().await;
        if self.is_closed() {
            info!("discarding write-back for closed session {}", self.id);
            return Err(AppError::AuthRequired);
        }
        update(&mut snapshot);
        Ok(())
    }

    /// Replaces the completion set with `op` applied to the latest set.
    pub(crate) async fn commit_completions(&self, op: &RemoteOp) -> Result<(), AppError> {
        self.commit(|snapshot| {
            let mut next = snapshot.completions.clone();
            op.apply(&mut next);
            snapshot.completions = next;
            self.completions_rev.fetch_add(1, Ordering::SeqCst);
        })
        .await
    }

    async fn close(&self) {
        let _snapshot = self.snapshot.write().await;
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn keep<T>(slot: &mut T, result: Result<T, AppError>, errors: &mut Vec<AppError>) {
    match result {
        Ok(value) => *slot = value,
        Err(e) => errors.push(e),
    }
}

/// Owns the current session scope and the flows that read or mutate it.
pub struct Dashboard {
    gateway: Arc<dyn DashboardGateway>,
    session: SessionStore,
    toggles: ModuleToggleController,
    timeout: Duration,
    current: RwLock<Option<Arc<SessionScope>>>,
    lifecycle: Mutex<()>,
}

impl Dashboard {
    pub fn new(gateway: Arc<dyn DashboardGateway>, session: SessionStore, timeout: Duration) -> Self {
        Self {
            toggles: ModuleToggleController::new(gateway.clone(), timeout),
            gateway,
            session,
            timeout,
            current: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn current_scope(&self) -> Option<Arc<SessionScope>> {
        self.current.read().await.clone()
    }

    fn ensure_signed_in(&self, session: &Session) -> Result<(), AppError> {
        if self.session.current().as_ref() == Some(session) {
            Ok(())
        } else {
            Err(AppError::AuthRequired)
        }
    }

    /// Returns the scope for `session`, opening it (and loading every
    /// resource) if it is not the current one. A failed first load still
    /// installs the scope with the parts that did load. Fails with
    /// `AuthRequired` once `session` is no longer the signed-in one.
    pub async fn scope_for(&self, session: &Session) -> Result<Arc<SessionScope>, AppError> {
        self.ensure_signed_in(session)?;
        if let Some(scope) = self.current_scope().await {
            if scope.session() == session {
                return Ok(scope);
            }
        }

        let _lifecycle = self.lifecycle.lock().await;
        // Sign-out may have run while we waited for the lock.
        self.ensure_signed_in(session)?;
        if let Some(scope) = self.current_scope().await {
            if scope.session() == session {
                return Ok(scope);
            }
        }

        let previous = self.current.write().await.take();
        if let Some(previous) = previous {
            previous.close().await;
        }

        let scope = Arc::new(SessionScope::new(session.clone()));
        info!("opening session scope {} for {}", scope.id(), session.user_id);
        let loaded = self.load(&scope).await;
        *self.current.write().await = Some(scope.clone());

        loaded.map(|_| scope)
    }

    /// Tears down the current scope. In-flight writes finish remotely but
    /// their results never reach a snapshot.
    pub async fn close(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let previous = self.current.write().await.take();
        if let Some(scope) = previous {
            scope.close().await;
            info!("closed session scope {} for {}", scope.id(), scope.session().user_id);
        }
    }

    pub async fn refresh(&self, scope: &SessionScope) -> Result<(), AppError> {
        self.load(scope).await
    }

    /// Fetches all four resources concurrently. Resources that fail keep
    /// their previous value (empty on first load); the first failure is
    /// returned after the rest are applied. Completions committed while the
    /// fetch was in flight are newer than the fetched rows and win.
    async fn load(&self, scope: &SessionScope) -> Result<(), AppError> {
        let session = scope.session();
        let gateway = &self.gateway;
        let rev = scope.completions_rev.load(Ordering::SeqCst);

        let (courses, modules, completions, profile) = tokio::join!(
            with_timeout(self.timeout, "loading courses", gateway.fetch_courses(session)),
            with_timeout(self.timeout, "loading modules", gateway.fetch_modules(session)),
            with_timeout(self.timeout, "loading completions", gateway.fetch_completions(session)),
            with_timeout(self.timeout, "loading profile", gateway.fetch_profile(session)),
        );
        let completions = completions.map(|rows| rows.into_iter().collect::<CompletionSet>());

        let mut errors = Vec::new();
        let mut counts = (0, 0, 0);
        scope
            .commit(|snapshot| {
                keep(&mut snapshot.courses, courses, &mut errors);
                keep(&mut snapshot.modules, modules, &mut errors);
                if scope.completions_rev.load(Ordering::SeqCst) == rev {
                    keep(&mut snapshot.completions, completions, &mut errors);
                } else {
                    debug!("keeping completions written during load for {}", session.user_id);
                }
                keep(&mut snapshot.profile, profile, &mut errors);
                snapshot.load_errors = errors.iter().map(|e| e.to_string()).collect();
                snapshot.loaded_at = Some(Utc::now());
                counts = (snapshot.courses.len(), snapshot.modules.len(), snapshot.completions.len());
            })
            .await?;

        debug!(
            "loaded {} courses, {} modules, {} completions for {}",
            counts.0, counts.1, counts.2, session.user_id
        );

        match errors.into_iter().next() {
            Some(e) => {
                warn!("load for {} was incomplete: {}", session.user_id, e);
                Err(e)
            }
            None => Ok(()),
        }
    }

    pub async fn toggle_module(&self, scope: &SessionScope, module_id: &str) -> Result<ToggleOutcome, AppError> {
        self.toggles.toggle(scope, module_id).await
    }

    pub async fn mark_all_complete(&self, scope: &SessionScope, course_id: &str) -> Result<MarkAllOutcome, AppError> {
        self.toggles.mark_all_complete(scope, course_id).await
    }

    /// Saves owner-editable profile fields. The scope's profile changes only
    /// after the remote update succeeds.
    pub async fn update_profile(&self, scope: &SessionScope, patch: ProfilePatch) -> Result<Profile, AppError> {
        let _writes = scope.profile_writes.lock().await;
        if scope.snapshot.read().await.profile.is_none() {
            return Err(AppError::NotFound);
        }

        if let Err(e) = with_timeout(
            self.timeout,
            "saving profile",
            self.gateway.update_profile(scope.session(), &patch),
        )
        .await
        {
            warn!("profile update for {} failed: {}", scope.session().user_id, e);
            return Err(e);
        }

        let mut updated = None;
        scope
            .commit(|snapshot| {
                if let Some(profile) = snapshot.profile.as_mut() {
                    profile.apply(&patch);
                    updated = Some(profile.clone());
                }
            })
            .await?;

        updated.ok_or(AppError::NotFound)
    }
}
