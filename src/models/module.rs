use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single learning unit. `order_index` defines the stable ordering within
/// its course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub duration: Option<String>,
}
