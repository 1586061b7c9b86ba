use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered player. Identity issuance and profile management live
/// outside this core; this struct is the read/write view the match engine
/// and matchmaker need.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub rating: i32,
    pub level: i32,
    pub wins: i32,
    pub losses: i32,
    pub is_online: bool,
    pub is_in_game: bool,
}
