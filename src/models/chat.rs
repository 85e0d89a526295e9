use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: i64,
    pub booking_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub created_at: String,
}
