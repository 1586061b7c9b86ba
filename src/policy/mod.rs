pub mod rating;
pub mod scoring;

pub use rating::{apply_rating, Outcome, RatingDelta};
pub use scoring::score_answer;
