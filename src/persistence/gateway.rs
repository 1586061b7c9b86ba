use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::question::Choice;
use crate::domain::{Match, MatchStatus, Question, Round, User};
use crate::error::PersistenceError;
use crate::policy::RatingDelta;

/// A round paired with the question it asks, as returned by `get_round`.
#[derive(Debug, Clone)]
pub struct RoundWithQuestion {
    pub round: Round,
    pub question: Question,
}

/// Single entry point for all mutations over Match/Round/MatchHistory/User
/// state. Every write here is one atomic unit; reads are non-transactional
/// snapshots.
#[derive(Clone)]
pub struct PersistenceGateway {
    pool: PgPool,
}

impl PersistenceGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_match_with_rounds(
        &self,
        player1: Uuid,
        player2: Uuid,
        questions: &[Question],
    ) -> Result<Match, PersistenceError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(PersistenceError::classify)?;

        let now = Utc::now();
        let total_rounds = questions.len() as i32;

        let m = sqlx::query_as::<_, Match>(
            r#"
            INSERT INTO matches (id, player1, player2, score1, score2, winner, status,
                                  current_round, total_rounds, created_at, started_at, ended_at)
            VALUES ($1, $2, $3, 0, 0, NULL, $4, 0, $5, $6, $6, NULL)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(player1)
        .bind(player2)
        .bind(MatchStatus::InProgress)
        .bind(total_rounds)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(PersistenceError::classify)?;

        for (idx, question) in questions.iter().enumerate() {
            let round_number = (idx + 1) as i32;
            sqlx::query(
                r#"
                INSERT INTO rounds (match_id, round_number, question_id, player1_score, player2_score)
                VALUES ($1, $2, $3, 0, 0)
                "#,
            )
            .bind(m.id)
            .bind(round_number)
            .bind(question.id)
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::classify)?;
        }

        sqlx::query("UPDATE users SET is_in_game = TRUE WHERE id = ANY($1)")
            .bind(&[player1, player2][..])
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::classify)?;

        tx.commit().await.map_err(PersistenceError::classify)?;
        Ok(m)
    }

    pub async fn get_round(
        &self,
        match_id: Uuid,
        round_number: i32,
    ) -> Result<RoundWithQuestion, PersistenceError> {
        let round = sqlx::query_as::<_, Round>(
            "SELECT * FROM rounds WHERE match_id = $1 AND round_number = $2",
        )
        .bind(match_id)
        .bind(round_number)
        .fetch_one(&self.pool)
        .await
        .map_err(PersistenceError::classify)?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT q.id, q.prompt, q.option_a, q.option_b, q.option_c, q.option_d,
                   q.correct_option, q.explanation, q.category_id, c.name AS category_name
            FROM questions q JOIN categories c ON c.id = q.category_id
            WHERE q.id = $1
            "#,
        )
        .bind(round.question_id)
        .fetch_one(&self.pool)
        .await
        .map_err(PersistenceError::classify)?;

        Ok(RoundWithQuestion { round, question })
    }

    pub async fn update_match_current_round(
        &self,
        match_id: Uuid,
        round_number: i32,
    ) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE matches SET current_round = $2 WHERE id = $1")
            .bind(match_id)
            .bind(round_number)
            .execute(&self.pool)
            .await
            .map_err(PersistenceError::classify)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_round_result(
        &self,
        match_id: Uuid,
        round_number: i32,
        player1_answer: Option<Choice>,
        player1_time: f64,
        player1_score: i32,
        player2_answer: Option<Choice>,
        player2_time: f64,
        player2_score: i32,
    ) -> Result<Match, PersistenceError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(PersistenceError::classify)?;

        sqlx::query(
            r#"
            UPDATE rounds
            SET player1_answer = $3, player1_time = $4, player1_score = $5,
                player2_answer = $6, player2_time = $7, player2_score = $8
            WHERE match_id = $1 AND round_number = $2
            "#,
        )
        .bind(match_id)
        .bind(round_number)
        .bind(player1_answer)
        .bind(player1_time)
        .bind(player1_score)
        .bind(player2_answer)
        .bind(player2_time)
        .bind(player2_score)
        .execute(&mut *tx)
        .await
        .map_err(PersistenceError::classify)?;

        let m = sqlx::query_as::<_, Match>(
            r#"
            UPDATE matches SET score1 = score1 + $2, score2 = score2 + $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(match_id)
        .bind(player1_score)
        .bind(player2_score)
        .fetch_one(&mut *tx)
        .await
        .map_err(PersistenceError::classify)?;

        tx.commit().await.map_err(PersistenceError::classify)?;
        Ok(m)
    }

    /// Applies the full finalisation side-effect set in one transaction:
    /// match status/winner, both users' rating/level/win-loss/in_game, and
    /// the two symmetric MatchHistory rows.
    pub async fn finalise_match(
        &self,
        match_id: Uuid,
        player1: Uuid,
        player2: Uuid,
        winner: Option<Uuid>,
        score1: i32,
        score2: i32,
        player1_delta: RatingDelta,
        player2_delta: RatingDelta,
    ) -> Result<(), PersistenceError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(PersistenceError::classify)?;

        let now = Utc::now();

        sqlx::query(
            "UPDATE matches SET status = $2, winner = $3, ended_at = $4 WHERE id = $1",
        )
        .bind(match_id)
        .bind(MatchStatus::Completed)
        .bind(winner)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(PersistenceError::classify)?;

        for (user_id, delta) in [(player1, &player1_delta), (player2, &player2_delta)] {
            sqlx::query(
                r#"
                UPDATE users
                SET rating = $2, level = $3, wins = wins + $4, losses = losses + $5, is_in_game = FALSE
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .bind(delta.new_rating)
            .bind(delta.new_level)
            .bind(delta.win_increment)
            .bind(delta.loss_increment)
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::classify)?;
        }

        let p1_winner = winner == Some(player1);
        let p2_winner = winner == Some(player2);

        sqlx::query(
            r#"
            INSERT INTO match_history
                (id, user_id, match_id, opponent_id, user_score, opponent_score, is_winner, rating_change, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(player1)
        .bind(match_id)
        .bind(player2)
        .bind(score1)
        .bind(score2)
        .bind(p1_winner)
        .bind(player1_delta.rating_change)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(PersistenceError::classify)?;

        sqlx::query(
            r#"
            INSERT INTO match_history
                (id, user_id, match_id, opponent_id, user_score, opponent_score, is_winner, rating_change, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(player2)
        .bind(match_id)
        .bind(player1)
        .bind(score2)
        .bind(score1)
        .bind(p2_winner)
        .bind(player2_delta.rating_change)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(PersistenceError::classify)?;

        tx.commit().await.map_err(PersistenceError::classify)?;
        Ok(())
    }

    /// Used by the engine's partial-outcome path when the full finalise
    /// transaction cannot be committed: leaves `status` as
    /// `in_progress` for later reconciliation but still clears `is_in_game`
    /// so the players aren't stuck unable to requeue.
    pub async fn clear_in_game(&self, player1: Uuid, player2: Uuid) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE users SET is_in_game = FALSE WHERE id = ANY($1)")
            .bind(&[player1, player2][..])
            .execute(&self.pool)
            .await
            .map_err(PersistenceError::classify)?;
        Ok(())
    }

    pub async fn set_online(&self, user_id: Uuid, online: bool) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE users SET is_online = $2 WHERE id = $1")
            .bind(user_id)
            .bind(online)
            .execute(&self.pool)
            .await
            .map_err(PersistenceError::classify)?;
        Ok(())
    }

    pub async fn set_in_game(&self, user_id: Uuid, in_game: bool) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE users SET is_in_game = $2 WHERE id = $1")
            .bind(user_id)
            .bind(in_game)
            .execute(&self.pool)
            .await
            .map_err(PersistenceError::classify)?;
        Ok(())
    }

    /// Non-transactional read used by finalisation to get the rating each
    /// player held going into the match.
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, PersistenceError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(PersistenceError::classify)
    }

    pub async fn get_match_scores(&self, match_id: Uuid) -> Result<Match, PersistenceError> {
        sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1")
            .bind(match_id)
            .fetch_one(&self.pool)
            .await
            .map_err(PersistenceError::classify)
    }

    pub async fn verify_player_in_match(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, PersistenceError> {
        let m = sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PersistenceError::classify)?;
        Ok(m.map(|m| m.participant(user_id)).unwrap_or(false))
    }

    pub async fn get_match_rounds(&self, match_id: Uuid) -> Result<Vec<RoundWithQuestion>, PersistenceError> {
        let rounds = sqlx::query_as::<_, Round>(
            "SELECT * FROM rounds WHERE match_id = $1 ORDER BY round_number",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .map_err(PersistenceError::classify)?;

        let mut out = Vec::with_capacity(rounds.len());
        for round in rounds {
            let question = sqlx::query_as::<_, Question>(
                r#"
                SELECT q.id, q.prompt, q.option_a, q.option_b, q.option_c, q.option_d,
                       q.correct_option, q.explanation, q.category_id, c.name AS category_name
                FROM questions q JOIN categories c ON c.id = q.category_id
                WHERE q.id = $1
                "#,
            )
            .bind(round.question_id)
            .fetch_one(&self.pool)
            .await
            .map_err(PersistenceError::classify)?;
            out.push(RoundWithQuestion { round, question });
        }
        Ok(out)
    }
}
