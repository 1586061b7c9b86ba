use crate::config::RatingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingDelta {
    pub new_rating: i32,
    pub new_level: i32,
    pub rating_change: i32,
    pub win_increment: i32,
    pub loss_increment: i32,
}

/// Maps (previous rating, outcome) to a new rating/level and the win/loss
/// counter increments to apply. Floored at `settings.rating_floor` on loss.
pub fn apply_rating(previous_rating: i32, outcome: Outcome, settings: &RatingSettings) -> RatingDelta {
    let (rating_change, win_increment, loss_increment) = match outcome {
        Outcome::Win => (settings.win_delta, 1, 0),
        Outcome::Loss => (settings.loss_delta, 0, 1),
        Outcome::Draw => (settings.draw_delta, 0, 0),
    };

    let new_rating = (previous_rating + rating_change).max(settings.rating_floor);
    // A floored loss still reports the nominal delta in history even though
    // the rating itself didn't move the full amount; `new_rating -
    // previous_rating` is what callers should use if they need the actual
    // applied delta.
    let new_level = new_rating / settings.level_divisor + 1;

    RatingDelta {
        new_rating,
        new_level,
        rating_change,
        win_increment,
        loss_increment,
    }
}
