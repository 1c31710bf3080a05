use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: i64,
    pub room_type: String,
    pub nightly_price: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomImage {
    pub id: i64,
    pub room_id: i64,
    pub url: String,
    pub object_key: String,
    pub created_at: String,
}

/// A room together with its gallery, as returned by the public API.
#[derive(Debug, Clone, Serialize)]
pub struct RoomWithImages {
    pub id: i64,
    pub room_type: String,
    pub nightly_price: f64,
    pub created_at: String,
    pub updated_at: String,
    pub images: Vec<RoomImage>,
}

impl RoomWithImages {
    pub fn from_parts(room: Room, images: Vec<RoomImage>) -> Self {
        Self {
            id: room.id,
            room_type: room.room_type,
            nightly_price: room.nightly_price,
            created_at: room.created_at,
            updated_at: room.updated_at,
            images,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: i64,
    pub room_id: i64,
    pub guest_name: String,
    pub phone: String,
    pub email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: String,
}

/// Admin dashboard row: reservation joined with its room's type.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReservationWithRoom {
    pub id: i64,
    pub room_id: i64,
    pub room_type: String,
    pub guest_name: String,
    pub phone: String,
    pub email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: String,
}

// DTOs for API

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub room_type: String,
    pub nightly_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoomRequest {
    pub room_type: Option<String>,
    pub nightly_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReservationRequest {
    pub room_id: i64,
    pub guest_name: String,
    pub phone: String,
    pub email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

// User models

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}
