pub mod match_record;
pub mod question;
pub mod user;

pub use match_record::{Match, MatchHistory, MatchStatus, Round};
pub use question::{Category, Choice, Question};
pub use user::User;
