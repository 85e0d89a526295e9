use serde::{Deserialize, Serialize};

/// Longest job a single catalog entry may describe.
pub const MAX_SERVICE_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
}
