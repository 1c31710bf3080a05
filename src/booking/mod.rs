//! Reservation creation.
//!
//! The naive flow (query for conflicts, then insert) lets two concurrent
//! requests for the same room both pass the check before either insert
//! commits. The engine closes that gap: a per-room async mutex serializes
//! bookings for a room, and the conflict query plus insert run inside one
//! transaction so nothing partial ever lands.

use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::availability::DateInterval;
use crate::db::{CreateReservationRequest, DbPool, Reservation};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("start date {start} is in the past")]
    DatesInPast { start: NaiveDate },
    #[error("room {0} not found")]
    RoomNotFound(i64),
    #[error("room is already reserved from {} to {}", .0.start, .0.end)]
    Conflict(DateInterval),
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

pub struct BookingEngine {
    db: DbPool,
    room_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl BookingEngine {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            room_locks: DashMap::new(),
        }
    }

    fn lock_for_room(&self, room_id: i64) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create a reservation, enforcing the no-overlap invariant at write time.
    ///
    /// `today` is the booking-time date; stays starting before it are
    /// rejected before storage is touched.
    pub async fn create(
        &self,
        req: &CreateReservationRequest,
        today: NaiveDate,
    ) -> Result<Reservation, BookingError> {
        let candidate =
            DateInterval::new(req.start_date, req.end_date).map_err(|_| {
                BookingError::InvalidRange {
                    start: req.start_date,
                    end: req.end_date,
                }
            })?;
        if req.start_date < today {
            return Err(BookingError::DatesInPast {
                start: req.start_date,
            });
        }

        // Hold the room's lock across check and insert. The transaction
        // keeps the pair atomic against crashes; the lock keeps it atomic
        // against concurrent bookings on other connections of this pool.
        let lock = self.lock_for_room(req.room_id);
        let _guard = lock.lock().await;

        let mut tx = self.db.begin().await?;

        let room: Option<(i64,)> = sqlx::query_as("SELECT id FROM rooms WHERE id = ?")
            .bind(req.room_id)
            .fetch_optional(&mut *tx)
            .await?;
        if room.is_none() {
            return Err(BookingError::RoomNotFound(req.room_id));
        }

        // Closed-interval overlap, same predicate as the availability module:
        // existing.start <= candidate.end AND existing.end >= candidate.start.
        let clash: Option<(NaiveDate, NaiveDate)> = sqlx::query_as(
            "SELECT start_date, end_date FROM reservations \
             WHERE room_id = ? AND start_date <= ? AND end_date >= ? \
             LIMIT 1",
        )
        .bind(req.room_id)
        .bind(candidate.end)
        .bind(candidate.start)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((start, end)) = clash {
            return Err(BookingError::Conflict(DateInterval { start, end }));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO reservations (room_id, guest_name, phone, email, start_date, end_date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(req.room_id)
        .bind(&req.guest_name)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(candidate.start)
        .bind(candidate.end)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        tx.commit().await?;

        tracing::info!(
            reservation_id = id,
            room_id = req.room_id,
            start = %candidate.start,
            end = %candidate.end,
            "Reservation created"
        );

        Ok(Reservation {
            id,
            room_id: req.room_id,
            guest_name: req.guest_name.clone(),
            phone: req.phone.clone(),
            email: req.email.clone(),
            start_date: candidate.start,
            end_date: candidate.end,
            created_at: now,
        })
    }
}
