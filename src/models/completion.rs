use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The existence of a row means `user_id` finished `module_id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, FromRow)]
pub struct Completion {
    pub user_id: String,
    pub module_id: String,
}

impl Completion {
    pub fn new(user_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            module_id: module_id.into(),
        }
    }
}

/// Completion records held for one session. At most one record per
/// (user, module) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletionSet(BTreeSet<Completion>);

impl CompletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_id: &str, module_id: &str) -> bool {
        self.0.iter().any(|c| c.user_id == user_id && c.module_id == module_id)
    }

    /// True when any record in the set covers `module_id`.
    pub fn has_module(&self, module_id: &str) -> bool {
        self.0.iter().any(|c| c.module_id == module_id)
    }

    pub fn insert(&mut self, completion: Completion) -> bool {
        self.0.insert(completion)
    }

    pub fn remove(&mut self, completion: &Completion) -> bool {
        self.0.remove(completion)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Completion> {
        self.0.iter()
    }
}

impl FromIterator<Completion> for CompletionSet {
    fn from_iter<I: IntoIterator<Item = Completion>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
