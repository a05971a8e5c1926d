use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::gateway::DashboardGateway;
use crate::models::{Completion, CompletionSet, Module};
use crate::services::dashboard::SessionScope;
use crate::services::with_timeout;

/// The single remote mutation a plan requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Insert(Vec<Completion>),
    Delete(Completion),
}

impl RemoteOp {
    pub fn apply(&self, completions: &mut CompletionSet) {
        match self {
            RemoteOp::Insert(rows) => {
                for row in rows {
                    completions.insert(row.clone());
                }
            }
            RemoteOp::Delete(row) => {
                completions.remove(row);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TogglePlan {
    pub completions: CompletionSet,
    pub op: RemoteOp,
}

impl TogglePlan {
    fn new(current: &CompletionSet, op: RemoteOp) -> Self {
        let mut completions = current.clone();
        op.apply(&mut completions);
        Self { completions, op }
    }
}

/// Deletes the (user, module) record when present, inserts it otherwise.
/// Planning twice from the result restores `current`.
pub fn plan_toggle(user_id: &str, module_id: &str, current: &CompletionSet) -> TogglePlan {
    let row = Completion::new(user_id, module_id);
    let op = if current.contains(user_id, module_id) {
        RemoteOp::Delete(row)
    } else {
        RemoteOp::Insert(vec![row])
    };
    TogglePlan::new(current, op)
}

/// One batched insert of every module in `course_modules` not yet completed.
/// `None` means the course is already complete and nothing should be written.
pub fn plan_mark_all(user_id: &str, course_modules: &[Module], current: &CompletionSet) -> Option<TogglePlan> {
    let missing: Vec<Completion> = course_modules
        .iter()
        .filter(|m| !current.contains(user_id, &m.id))
        .map(|m| Completion::new(user_id, m.id.as_str()))
        .collect();

    if missing.is_empty() {
        return None;
    }
    Some(TogglePlan::new(current, RemoteOp::Insert(missing)))
}

/// A closed scope belongs to a signed-out session; nothing is sent for it.
fn ensure_open(scope: &SessionScope) -> Result<(), AppError> {
    if scope.is_closed() {
        return Err(AppError::AuthRequired);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub module_id: String,
    pub completed: bool,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MarkAllOutcome {
    Completed { inserted: usize, message: &'static str },
    AlreadyComplete { message: &'static str },
}

/// Runs toggle plans against the gateway. The remote write always finishes
/// before the scope's completions change; a failed write leaves them as-is.
pub struct ModuleToggleController {
    gateway: Arc<dyn DashboardGateway>,
    timeout: Duration,
}

impl ModuleToggleController {
    pub fn new(gateway: Arc<dyn DashboardGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub async fn toggle(&self, scope: &SessionScope, module_id: &str) -> Result<ToggleOutcome, AppError> {
        if !scope.has_module(module_id).await {
            return Err(AppError::NotFound);
        }

        let _guard = scope.lock_modules(&[module_id.to_string()]).await;
        ensure_open(scope)?;
        let current = scope.completions().await;
        let plan = plan_toggle(&scope.session().user_id, module_id, &current);

        self.execute(scope, &plan.op).await?;
        scope.commit_completions(&plan.op).await?;

        let completed = matches!(plan.op, RemoteOp::Insert(_));
        info!("module {} completed={} for {}", module_id, completed, scope.session().user_id);

        Ok(ToggleOutcome {
            module_id: module_id.to_string(),
            completed,
            message: if completed {
                "Module completed!"
            } else {
                "Module marked as incomplete"
            },
        })
    }

    pub async fn mark_all_complete(&self, scope: &SessionScope, course_id: &str) -> Result<MarkAllOutcome, AppError> {
        let course_modules = scope.course_modules(course_id).await?;
        let ids: Vec<String> = course_modules.iter().map(|m| m.id.clone()).collect();

        let _guards = scope.lock_modules(&ids).await;
        ensure_open(scope)?;
        let current = scope.completions().await;

        let Some(plan) = plan_mark_all(&scope.session().user_id, &course_modules, &current) else {
            info!("course {} already complete for {}", course_id, scope.session().user_id);
            return Ok(MarkAllOutcome::AlreadyComplete {
                message: "All modules already completed!",
            });
        };

        self.execute(scope, &plan.op).await?;
        scope.commit_completions(&plan.op).await?;

        let inserted = match &plan.op {
            RemoteOp::Insert(rows) => rows.len(),
            RemoteOp::Delete(_) => 0,
        };
        info!("marked {} modules of {} complete", inserted, course_id);

        Ok(MarkAllOutcome::Completed {
            inserted,
            message: "All modules completed!",
        })
    }

    async fn execute(&self, scope: &SessionScope, op: &RemoteOp) -> Result<(), AppError> {
        let session = scope.session();
        let result = match op {
            RemoteOp::Insert(rows) => {
                with_timeout(self.timeout, "saving progress", self.gateway.insert_completions(session, rows)).await
            }
            RemoteOp::Delete(row) => {
                with_timeout(
                    self.timeout,
                    "saving progress",
                    self.gateway.delete_completion(session, &row.module_id),
                )
                .await
            }
        };

        if let Err(e) = &result {
            warn!("progress update for {} failed: {}", session.user_id, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: &str) -> Module {
        Module {
            id: id.to_string(),
            course_id: "c1".to_string(),
            title: id.to_uppercase(),
            description: None,
            order_index: 0,
            duration: None,
        }
    }

    fn set(ids: &[&str]) -> CompletionSet {
        ids.iter().map(|id| Completion::new("u1", *id)).collect()
    }

    #[test]
    fn toggle_inserts_missing_completion() {
        let plan = plan_toggle("u1", "m2", &set(&["m1"]));
        assert_eq!(plan.op, RemoteOp::Insert(vec![Completion::new("u1", "m2")]));
        assert_eq!(plan.completions, set(&["m1", "m2"]));
    }

    #[test]
    fn toggle_deletes_existing_completion() {
        let plan = plan_toggle("u1", "m1", &set(&["m1", "m2"]));
        assert_eq!(plan.op, RemoteOp::Delete(Completion::new("u1", "m1")));
        assert_eq!(plan.completions, set(&["m2"]));
    }

    #[test]
    fn double_toggle_restores_original_set() {
        let states = [set(&[]), set(&["m1"]), set(&["m1", "m2", "m3"]), set(&["m2"])];

        for original in states {
            for module_id in ["m1", "m2", "m4"] {
                let once = plan_toggle("u1", module_id, &original);
                let twice = plan_toggle("u1", module_id, &once.completions);
                assert_eq!(twice.completions, original, "module {}", module_id);
            }
        }
    }

    #[test]
    fn toggle_ignores_other_users_records() {
        let mut current = set(&[]);
        current.insert(Completion::new("u2", "m1"));

        let plan = plan_toggle("u1", "m1", &current);
        assert_eq!(plan.op, RemoteOp::Insert(vec![Completion::new("u1", "m1")]));
    }

    #[test]
    fn mark_all_inserts_only_missing_modules() {
        let modules = vec![module("m1"), module("m2"), module("m3")];
        let plan = plan_mark_all("u1", &modules, &set(&["m1"])).expect("work to do");

        assert_eq!(
            plan.op,
            RemoteOp::Insert(vec![Completion::new("u1", "m2"), Completion::new("u1", "m3")])
        );
        assert_eq!(plan.completions, set(&["m1", "m2", "m3"]));

        assert!(plan_mark_all("u1", &modules, &plan.completions).is_none());
    }

    #[test]
    fn mark_all_on_empty_course_is_noop() {
        assert!(plan_mark_all("u1", &[], &set(&["m1"])).is_none());
    }
}
