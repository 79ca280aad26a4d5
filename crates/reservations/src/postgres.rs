use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{HolderId, ItemId, ReservationId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AcquireOutcome, AcquireRequest, Reservation, ReservationError, Result,
    store::ReservationStore,
};

/// Number of times an acquire is retried when the row that rejected the
/// upsert has changed by the follow-up read (released, expired, or taken
/// over by the same holder).
const ACQUIRE_ATTEMPTS: usize = 3;

/// PostgreSQL-backed lease store.
///
/// The `reservations` table is keyed by `item_id`; admission is a single
/// `INSERT .. ON CONFLICT .. DO UPDATE .. WHERE` statement.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Creates a new PostgreSQL lease store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        Ok(Reservation {
            reservation_id: ReservationId::from_uuid(row.try_get::<Uuid, _>("reservation_id")?),
            item_id: ItemId::new(row.try_get::<String, _>("item_id")?),
            holder_id: HolderId::new(row.try_get::<String, _>("holder_id")?),
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn acquire(&self, request: AcquireRequest) -> Result<AcquireOutcome> {
        for _ in 0..ACQUIRE_ATTEMPTS {
            let candidate = ReservationId::new();

            // The row is only overwritten when it belongs to the same holder
            // or has expired. A live lease of the same holder keeps its id
            // and creation time.
            let row = sqlx::query(
                r#"
                INSERT INTO reservations (reservation_id, item_id, holder_id, created_at, expires_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (item_id) DO UPDATE SET
                    reservation_id = CASE
                        WHEN reservations.holder_id = EXCLUDED.holder_id
                         AND reservations.expires_at >= EXCLUDED.created_at
                        THEN reservations.reservation_id
                        ELSE EXCLUDED.reservation_id
                    END,
                    created_at = CASE
                        WHEN reservations.holder_id = EXCLUDED.holder_id
                         AND reservations.expires_at >= EXCLUDED.created_at
                        THEN reservations.created_at
                        ELSE EXCLUDED.created_at
                    END,
                    holder_id = EXCLUDED.holder_id,
                    expires_at = EXCLUDED.expires_at
                WHERE reservations.holder_id = EXCLUDED.holder_id
                   OR reservations.expires_at < EXCLUDED.created_at
                RETURNING reservation_id, item_id, holder_id, created_at, expires_at
                "#,
            )
            .bind(candidate.as_uuid())
            .bind(request.item_id.as_str())
            .bind(request.holder_id.as_str())
            .bind(request.now)
            .bind(request.expires_at)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = row {
                let reservation = Self::row_to_reservation(row)?;
                return Ok(if reservation.reservation_id == candidate {
                    AcquireOutcome::Acquired(reservation)
                } else {
                    AcquireOutcome::Refreshed(reservation)
                });
            }

            let existing = self.get(&request.item_id).await?;
            if let Some(blocking) = blocking_lease(existing, &request) {
                return Ok(AcquireOutcome::HeldByOther(blocking));
            }

            tracing::debug!(
                item_id = %request.item_id,
                "blocking lease changed before it could be read, retrying acquire"
            );
        }

        Err(ReservationError::Contended(request.item_id))
    }

    async fn extend(
        &self,
        item_id: &ItemId,
        holder_id: &HolderId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            UPDATE reservations
            SET expires_at = $4
            WHERE item_id = $1 AND holder_id = $2 AND expires_at >= $3
            RETURNING reservation_id, item_id, holder_id, created_at, expires_at
            "#,
        )
        .bind(item_id.as_str())
        .bind(holder_id.as_str())
        .bind(now)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn release(
        &self,
        item_id: &ItemId,
        holder_id: &HolderId,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            DELETE FROM reservations
            WHERE item_id = $1 AND holder_id = $2
            RETURNING reservation_id, item_id, holder_id, created_at, expires_at
            "#,
        )
        .bind(item_id.as_str())
        .bind(holder_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn get(&self, item_id: &ItemId) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT reservation_id, item_id, holder_id, created_at, expires_at
            FROM reservations
            WHERE item_id = $1
            "#,
        )
        .bind(item_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            DELETE FROM reservations
            WHERE expires_at < $1
            RETURNING reservation_id, item_id, holder_id, created_at, expires_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut released = rows
            .into_iter()
            .map(Self::row_to_reservation)
            .collect::<Result<Vec<_>>>()?;
        released.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(released)
    }
}

/// The lease read back after a rejected upsert, if it still blocks the
/// requesting holder.
fn blocking_lease(existing: Option<Reservation>, request: &AcquireRequest) -> Option<Reservation> {
    existing.filter(|lease| lease.blocks(&request.holder_id, request.now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn request(holder: &str, now: DateTime<Utc>) -> AcquireRequest {
        AcquireRequest {
            item_id: ItemId::new("SKU-001"),
            holder_id: HolderId::new(holder),
            now,
            expires_at: now + TimeDelta::minutes(20),
        }
    }

    fn lease(holder: &str, expires_at: DateTime<Utc>) -> Reservation {
        Reservation {
            reservation_id: ReservationId::new(),
            item_id: ItemId::new("SKU-001"),
            holder_id: HolderId::new(holder),
            created_at: expires_at - TimeDelta::minutes(20),
            expires_at,
        }
    }

    #[test]
    fn test_live_lease_of_other_holder_blocks() {
        let now = Utc::now();
        let existing = lease("u1", now + TimeDelta::minutes(5));
        assert_eq!(
            blocking_lease(Some(existing.clone()), &request("u2", now)),
            Some(existing)
        );
    }

    #[test]
    fn test_stale_read_back_does_not_block() {
        let now = Utc::now();
        // Expired between the upsert and the read.
        let expired = lease("u1", now - TimeDelta::seconds(1));
        assert_eq!(blocking_lease(Some(expired), &request("u2", now)), None);
        // A concurrent request by the same holder won the row.
        let own = lease("u2", now + TimeDelta::minutes(20));
        assert_eq!(blocking_lease(Some(own), &request("u2", now)), None);
        assert_eq!(blocking_lease(None, &request("u2", now)), None);
    }
}
