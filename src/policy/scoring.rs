/// Points awarded for one player's answer to one round.
///
/// `latency_seconds` must already be the clamped value — the minimum of the
/// client-reported latency and the server wall-clock elapsed since the
/// round started — computed by the caller (see `engine::round`). A missing
/// answer scores 0 regardless of latency.
///
/// Latency is never floored at a small positive value: a client reporting
/// `0` on a correct answer scores the same 100 bracket as a genuinely fast
/// answer.
pub fn score_answer(correct: bool, latency_seconds: f64) -> i32 {
    if !correct {
        return 0;
    }
    if latency_seconds <= 3.0 {
        100
    } else if latency_seconds <= 7.0 {
        70
    } else if latency_seconds <= 15.0 {
        40
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn incorrect_answer_always_zero() {
        assert_eq!(score_answer(false, 0.0), 0);
        assert_eq!(score_answer(false, 1.0), 0);
        assert_eq!(score_answer(false, 100.0), 0);
    }

    #[test]
    fn brackets_match_expected_thresholds() {
        assert_eq!(score_answer(true, 2.0), 100);
        assert_eq!(score_answer(true, 3.0), 100);
        assert_eq!(score_answer(true, 5.0), 70);
        assert_eq!(score_answer(true, 7.0), 70);
        assert_eq!(score_answer(true, 10.0), 40);
        assert_eq!(score_answer(true, 15.0), 40);
        assert_eq!(score_answer(true, 15.0001), 0);
    }

    #[test]
    fn zero_latency_correct_answer_scores_max() {
        // Deliberately not floored — see doc comment above.
        assert_eq!(score_answer(true, 0.0), 100);
    }

    proptest! {
        #[test]
        fn score_is_always_one_of_the_four_values(correct in any::<bool>(), latency in 0.0f64..120.0) {
            let s = score_answer(correct, latency);
            prop_assert!(matches!(s, 0 | 40 | 70 | 100));
        }

        #[test]
        fn score_never_negative(correct in any::<bool>(), latency in -10.0f64..120.0) {
            let s = score_answer(correct, latency);
            prop_assert!(s >= 0);
        }
    }
}
