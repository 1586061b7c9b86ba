use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::question::Choice;

// --- Client -> Server ---

#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
pub enum MatchmakingClientMessage {
    #[serde(rename = "cancel")]
    Cancel,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
pub enum GameClientMessage {
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "answer")]
    Answer { answer: Choice, time: f64 },
    #[serde(rename = "emoji")]
    Emoji { emoji: String },
}

// --- Server -> Client ---

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum MatchmakingServerMessage {
    #[serde(rename = "matchmaking_start")]
    MatchmakingStart { message: String },
    #[serde(rename = "match_found")]
    MatchFound { r#match: MatchFoundPayload },
    #[serde(rename = "pairing_failed")]
    PairingFailed { reason: String },
    #[serde(rename = "error")]
    Error { code: ErrorCode, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchFoundPayload {
    pub id: Uuid,
    pub player1: Uuid,
    pub player2: Uuid,
    pub total_rounds: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionPayload {
    pub id: Uuid,
    pub text: String,
    pub options: HashMap<String, String>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerRoundResult {
    pub answer: Option<Choice>,
    pub time: f64,
    pub score: i32,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundEndPayload {
    pub correct_answer: Choice,
    pub explanation: String,
    pub players: HashMap<Uuid, PlayerRoundResult>,
    pub total_scores: HashMap<Uuid, i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchEndPlayerSummary {
    pub id: Uuid,
    pub username: String,
    pub score: i32,
    pub new_rating: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundReview {
    pub round_number: i32,
    pub question_text: String,
    pub correct_answer: Choice,
    pub explanation: String,
    pub player1_answer: Option<Choice>,
    pub player2_answer: Option<Choice>,
    pub player1_score: i32,
    pub player2_score: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchEndPayload {
    pub winner_id: Option<Uuid>,
    pub player1: MatchEndPlayerSummary,
    pub player2: MatchEndPlayerSummary,
    pub rounds: Vec<RoundReview>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum GameServerMessage {
    #[serde(rename = "connected")]
    Connected { match_id: Uuid, players_ready: usize },
    #[serde(rename = "game_start")]
    GameStart { message: String },
    #[serde(rename = "question_start")]
    QuestionStart { round: i32, question: QuestionPayload },
    #[serde(rename = "answer_submitted")]
    AnswerSubmitted { user_id: Uuid },
    #[serde(rename = "round_end")]
    RoundEnd { round: i32, result: RoundEndPayload },
    #[serde(rename = "match_end")]
    MatchEnd { result: MatchEndPayload },
    #[serde(rename = "emoji_received")]
    EmojiReceived { emoji: String },
    #[serde(rename = "error")]
    Error { code: ErrorCode, message: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthenticated,
    NotAParticipant,
    AlreadyQueued,
    AlreadyInGame,
    Superseded,
    InsufficientQuestions,
    InternalError,
}
