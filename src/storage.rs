use sqlx::PgPool;

use crate::errors::{AppError, ResultExt};
use crate::models::{Booking, LoyaltyPoints, UserProfile, STATUS_COMPLETED};

/// Read side of the customer rollup: the three inputs are fetched as a unit
/// so the fold either sees a consistent snapshot or nothing. Any failed read
/// aborts the whole rollup; nothing partial is ever published.
pub struct CustomerDataStore {
    pool: PgPool,
}

impl CustomerDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches bookings, registered profiles, and loyalty balances for the fold.
    pub async fn fetch_rollup_inputs(
        &self,
    ) -> Result<(Vec<Booking>, Vec<UserProfile>, Vec<LoyaltyPoints>), AppError> {
        let bookings =
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .context("Failed to fetch bookings for rollup")?;

        let profiles =
            sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await
                .context("Failed to fetch user profiles for rollup")?;

        let points = sqlx::query_as::<_, LoyaltyPoints>("SELECT * FROM loyalty_points")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch loyalty points for rollup")?;

        Ok((bookings, profiles, points))
    }

    /// Completed bookings only, for the revenue rollup.
    pub async fn fetch_completed_bookings(&self) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE status = $1 ORDER BY scheduled_date DESC",
        )
        .bind(STATUS_COMPLETED)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch completed bookings")
    }
}
