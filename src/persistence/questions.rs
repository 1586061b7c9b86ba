use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Question;
use crate::error::PairingError;

/// Read-only view over seeded questions. Seeding itself is out of scope
/// — this only ever selects, never mutates.
#[derive(Clone)]
pub struct QuestionRepository {
    pool: PgPool,
}

impl QuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Uniform selection without replacement from the matching set.
    /// Fails with `InsufficientQuestions` if fewer than `n` rows match.
    pub async fn random(
        &self,
        n: u32,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Question>, PairingError> {
        let rows = sqlx::query_as::<_, Question>(
            r#"
            SELECT q.id, q.prompt, q.option_a, q.option_b, q.option_c, q.option_d,
                   q.correct_option, q.explanation, q.category_id, c.name AS category_name
            FROM questions q
            JOIN categories c ON c.id = q.category_id
            WHERE $1::uuid IS NULL OR q.category_id = $1
            ORDER BY RANDOM()
            LIMIT $2
            "#,
        )
        .bind(category_id)
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|_| PairingError::PersistenceFailed)?;

        if (rows.len() as u32) < n {
            return Err(PairingError::InsufficientQuestions);
        }

        Ok(rows)
    }
}
