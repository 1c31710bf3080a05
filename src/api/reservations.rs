//! Reservation endpoints: guest-facing booking and occupied-dates lookup,
//! admin listing and deletion.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::availability::{self, DateInterval};
use crate::db::{CreateReservationRequest, Reservation, ReservationWithRoom, Room, User};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_guest_name, validate_phone};

fn validate_create_request(req: &CreateReservationRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_guest_name(&req.guest_name) {
        errors.add("guest_name", e);
    }
    if let Err(e) = validate_phone(&req.phone) {
        errors.add("phone", e);
    }
    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    }

    errors.finish()
}

/// Book a room.
///
/// The booking engine owns the conflict check and the insert; the email
/// confirmation afterwards is best-effort and never affects the committed
/// reservation.
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    validate_create_request(&req)?;

    let today = chrono::Utc::now().date_naive();
    let reservation = state.booking.create(&req, today).await?;

    // The reservation is committed; nothing past this point may fail the
    // request.
    send_confirmation_email(&state, &reservation).await;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Load the room and send the confirmation email, best-effort. The room
/// re-fetch can fail on its own (the room may even have been deleted since
/// the commit); like a failed send, that only warrants a warning.
async fn send_confirmation_email(state: &AppState, reservation: &Reservation) {
    let room = match sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(reservation.room_id)
        .fetch_optional(&state.db)
        .await
    {
        Ok(Some(room)) => room,
        Ok(None) => {
            tracing::warn!(
                reservation_id = reservation.id,
                room_id = reservation.room_id,
                "Room missing after booking; skipping confirmation email"
            );
            return;
        }
        Err(e) => {
            tracing::warn!(
                reservation_id = reservation.id,
                error = %e,
                "Could not load room for confirmation email"
            );
            return;
        }
    };

    if let Err(e) = state.mailer.send_confirmation(reservation, &room).await {
        tracing::warn!(
            reservation_id = reservation.id,
            error = %e,
            "Confirmation email failed; reservation stands"
        );
    }
}

#[derive(Debug, Deserialize)]
pub struct OccupiedDatesQuery {
    pub room_id: i64,
}

/// Occupied intervals for a room, for calendar rendering.
///
/// Dates cross this boundary as `YYYY-MM-DD` strings; there is no
/// time-of-day component to discard on the way out.
pub async fn occupied_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OccupiedDatesQuery>,
) -> Result<Json<Vec<DateInterval>>, ApiError> {
    let room: Option<(i64,)> = sqlx::query_as("SELECT id FROM rooms WHERE id = ?")
        .bind(query.room_id)
        .fetch_optional(&state.db)
        .await?;
    if room.is_none() {
        return Err(ApiError::not_found("Room not found"));
    }

    let intervals = availability::list_occupied_intervals(&state.db, query.room_id).await?;
    Ok(Json(intervals))
}

/// List all reservations with their room types (admin)
pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<Vec<ReservationWithRoom>>, ApiError> {
    let reservations = sqlx::query_as::<_, ReservationWithRoom>(
        "SELECT r.id, r.room_id, rooms.room_type, r.guest_name, r.phone, r.email, \
                r.start_date, r.end_date, r.created_at \
         FROM reservations r \
         JOIN rooms ON rooms.id = r.room_id \
         ORDER BY r.start_date DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(reservations))
}

/// Delete a reservation (admin)
pub async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM reservations WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Reservation not found"));
    }

    tracing::info!(reservation_id = id, admin = %user.email, "Reservation deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_confirmation_is_best_effort_when_room_is_gone() {
        let db = crate::db::connect("sqlite::memory:", 1).await.unwrap();
        let state = AppState::new(Config::default(), db, None);

        let reservation = Reservation {
            id: 7,
            room_id: 42,
            guest_name: "Marta Ruiz".to_string(),
            phone: "+34 600 123 456".to_string(),
            email: "marta@example.com".to_string(),
            start_date: "2024-03-01".parse().unwrap(),
            end_date: "2024-03-03".parse().unwrap(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        // Room 42 does not exist; the helper must return without erroring
        // so the committed reservation is still reported to the guest.
        send_confirmation_email(&state, &reservation).await;
    }
}
