//! Room CRUD and room image management.
//!
//! Image replacement ordering: new objects are uploaded first, the database
//! rows are swapped in one transaction, and only then are the old remote
//! objects deleted. A failure mid-way can leave an unreferenced object in
//! the bucket (logged), but never a database row pointing at a missing one.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{CreateRoomRequest, Room, RoomImage, RoomWithImages, UpdateRoomRequest, User};
use crate::storage::StoredImage;
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_nightly_price, validate_room_type};

fn validate_create_request(req: &CreateRoomRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_room_type(&req.room_type) {
        errors.add("room_type", e);
    }
    if let Err(e) = validate_nightly_price(req.nightly_price) {
        errors.add("nightly_price", e);
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateRoomRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(ref room_type) = req.room_type {
        if let Err(e) = validate_room_type(room_type) {
            errors.add("room_type", e);
        }
    }
    if let Some(price) = req.nightly_price {
        if let Err(e) = validate_nightly_price(price) {
            errors.add("nightly_price", e);
        }
    }

    errors.finish()
}

async fn images_for_room(db: &crate::db::DbPool, room_id: i64) -> Result<Vec<RoomImage>, ApiError> {
    let images = sqlx::query_as::<_, RoomImage>(
        "SELECT * FROM room_images WHERE room_id = ? ORDER BY created_at",
    )
    .bind(room_id)
    .fetch_all(db)
    .await?;
    Ok(images)
}

/// List all rooms with their galleries
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomWithImages>>, ApiError> {
    let rooms = sqlx::query_as::<_, Room>("SELECT * FROM rooms ORDER BY id")
        .fetch_all(&state.db)
        .await?;

    let mut results = Vec::new();
    for room in rooms {
        let images = images_for_room(&state.db, room.id).await?;
        results.push(RoomWithImages::from_parts(room, images));
    }

    Ok(Json(results))
}

/// Get a single room with its gallery
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RoomWithImages>, ApiError> {
    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let images = images_for_room(&state.db, id).await?;
    Ok(Json(RoomWithImages::from_parts(room, images)))
}

/// Create a room (admin)
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    validate_create_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO rooms (room_type, nightly_price, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(req.room_type.trim())
    .bind(req.nightly_price)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&state.db)
        .await?;

    tracing::info!(room_id = room.id, admin = %user.email, "Room created");

    Ok((StatusCode::CREATED, Json(room)))
}

/// Update a room's type and/or price (admin)
pub async fn update_room(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoomRequest>,
) -> Result<Json<Room>, ApiError> {
    validate_update_request(&req)?;

    let _existing = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        UPDATE rooms SET
            room_type = COALESCE(?, room_type),
            nightly_price = COALESCE(?, nightly_price),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.room_type.as_deref().map(str::trim))
    .bind(req.nightly_price)
    .bind(&now)
    .bind(id)
    .execute(&state.db)
    .await?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(room_id = id, admin = %user.email, "Room updated");

    Ok(Json(room))
}

/// Delete a room, its reservations, and its images (admin)
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let images = images_for_room(&state.db, id).await?;

    let result = sqlx::query("DELETE FROM rooms WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Room not found"));
    }

    // Rows are gone (images cascaded); now clear the bucket. Failures leave
    // only unreferenced objects behind, so log and continue.
    if let Some(store) = &state.images {
        for image in &images {
            if let Err(e) = store.delete(&image.object_key).await {
                tracing::warn!(key = %image.object_key, error = %e, "Failed to delete remote image");
            }
        }
    }

    tracing::info!(room_id = id, admin = %user.email, "Room deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadImagesQuery {
    /// When true, the uploaded files replace the room's existing gallery.
    #[serde(default)]
    pub replace: bool,
}

/// Upload one or more images for a room (admin, multipart)
pub async fn upload_room_images(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
    Query(query): Query<UploadImagesQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<RoomImage>>), ApiError> {
    let store = state
        .images
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Image storage is not configured"))?;

    let _room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    // Upload every file to the bucket before touching the database.
    let mut uploaded: Vec<StoredImage> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        if bytes.is_empty() {
            continue;
        }

        let stored = store
            .upload(id, &filename, content_type.as_deref(), bytes.to_vec())
            .await
            .map_err(|e| {
                tracing::error!(room_id = id, error = %e, "Image upload failed");
                ApiError::new(
                    super::error::ErrorCode::ExternalServiceError,
                    "Failed to store image",
                )
            })?;
        uploaded.push(stored);
    }

    if uploaded.is_empty() {
        return Err(ApiError::bad_request("No image files in request"));
    }

    let old_images = if query.replace {
        images_for_room(&state.db, id).await?
    } else {
        Vec::new()
    };

    // Swap the rows atomically.
    let now = chrono::Utc::now().to_rfc3339();
    let mut tx = state.db.begin().await?;
    if query.replace {
        sqlx::query("DELETE FROM room_images WHERE room_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    for stored in &uploaded {
        sqlx::query(
            "INSERT INTO room_images (room_id, url, object_key, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&stored.url)
        .bind(&stored.object_key)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    // Old objects are unreferenced now; best-effort cleanup.
    for image in &old_images {
        if let Err(e) = store.delete(&image.object_key).await {
            tracing::warn!(key = %image.object_key, error = %e, "Failed to delete replaced image");
        }
    }

    let images = images_for_room(&state.db, id).await?;

    tracing::info!(
        room_id = id,
        admin = %user.email,
        count = uploaded.len(),
        replaced = query.replace,
        "Room images uploaded"
    );

    Ok((StatusCode::CREATED, Json(images)))
}

/// Delete a single room image (admin)
///
/// Remote object first, row second: if the bucket delete fails the row is
/// kept and the error surfaces, so the gallery never shows a broken URL.
pub async fn delete_room_image(
    State(state): State<Arc<AppState>>,
    user: User,
    Path((room_id, image_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let image = sqlx::query_as::<_, RoomImage>(
        "SELECT * FROM room_images WHERE id = ? AND room_id = ?",
    )
    .bind(image_id)
    .bind(room_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Image not found"))?;

    if let Some(store) = &state.images {
        store.delete(&image.object_key).await.map_err(|e| {
            tracing::error!(key = %image.object_key, error = %e, "Failed to delete remote image");
            ApiError::new(
                super::error::ErrorCode::ExternalServiceError,
                "Failed to delete image from storage",
            )
        })?;
    }

    sqlx::query("DELETE FROM room_images WHERE id = ?")
        .bind(image_id)
        .execute(&state.db)
        .await?;

    tracing::info!(room_id, image_id, admin = %user.email, "Room image deleted");

    Ok(StatusCode::NO_CONTENT)
}
