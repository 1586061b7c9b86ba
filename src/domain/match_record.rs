use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::question::Choice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    InProgress,
    Completed,
}

/// `player1 != player2`; `status` transitions monotonically
/// `Waiting -> InProgress -> Completed`; `winner` is `None` iff the match
/// is a draw or has not completed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: Uuid,
    pub player1: Uuid,
    pub player2: Uuid,
    pub score1: i32,
    pub score2: i32,
    pub winner: Option<Uuid>,
    pub status: MatchStatus,
    pub current_round: i32,
    pub total_rounds: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn participant(&self, player_id: Uuid) -> bool {
        self.player1 == player_id || self.player2 == player_id
    }
}

/// `(match, round_number)` is unique; scores are non-negative; an answer
/// is one of `{A,B,C,D,None}`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Round {
    pub match_id: Uuid,
    pub round_number: i32,
    pub question_id: Uuid,
    pub player1_answer: Option<Choice>,
    pub player2_answer: Option<Choice>,
    pub player1_time: Option<f64>,
    pub player2_time: Option<f64>,
    pub player1_score: i32,
    pub player2_score: i32,
}

/// Append-only; exactly two rows exist per completed match.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub opponent_id: Uuid,
    pub user_score: i32,
    pub opponent_score: i32,
    pub is_winner: bool,
    pub rating_change: i32,
    pub created_at: DateTime<Utc>,
}
