use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: String,
    pub owner_id: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub remembered: bool,
    pub is_deleted: bool,
    pub created_at: String,
}

/// Vehicle as described on a booking request. A missing year means the current one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleSpec {
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
}
