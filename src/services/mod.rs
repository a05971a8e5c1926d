pub mod achievements;
pub mod dashboard;
pub mod toggle;

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::AppError;

pub use achievements::{ACHIEVEMENTS, Achievement, AchievementStatus};
pub use dashboard::{Dashboard, SessionScope, Snapshot};
pub use toggle::{MarkAllOutcome, ModuleToggleController, RemoteOp, ToggleOutcome, TogglePlan};

/// Bounds a remote call; expiry counts as a failure of that call.
pub async fn with_timeout<T, F>(limit: Duration, what: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("timed out after {:?} while {}", limit, what);
            Err(AppError::Timeout(what))
        }
    }
}
