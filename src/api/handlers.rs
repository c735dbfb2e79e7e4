use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::extract::AuthUser;
use super::AppState;
use crate::auth::{hash_password, verify_password};
use crate::cursor::CursorData;
use crate::models::user::{normalize_email, normalize_handle};
use crate::models::{
    CreateAccountRequest, HandleSearchRequest, LoginRequest, NewUser, ProfileSummary,
    ProfileUpdate, PublicProfile, UpdateProfileRequest, User,
};
use crate::storage::StorageError;

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}

impl SuccessResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub image: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub cursor: Option<String>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct ProfilePage {
    pub profiles: Vec<ProfileSummary>,
    pub next_cursor: Option<String>,
}

/// Create a new account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let email = normalize_email(&payload.email);
    if state.storage.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "A user with that email is already registered".to_string(),
        ));
    }

    let handle = normalize_handle(&payload.handle);
    if handle.is_empty() {
        return Err(ApiError::Validation(vec![
            "handle must contain letters or digits".to_string(),
        ]));
    }
    if state.storage.find_user_by_handle(&handle).await?.is_some() {
        return Err(ApiError::Conflict("Handle is not available".to_string()));
    }

    let new_user = NewUser {
        handle,
        name: payload.name.trim().to_string(),
        email,
        password_hash: hash_password(&payload.password).await?,
    };

    // A concurrent registration can still win between the checks and here.
    let user = state.storage.create_user(&new_user).await.map_err(|e| match e {
        StorageError::Conflict => {
            ApiError::Conflict("Email or handle is already registered".to_string())
        }
        other => other.into(),
    })?;

    info!(user_id = user.id, handle = %user.handle, "account created");
    Ok((StatusCode::CREATED, SuccessResponse::new("Account created")))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let user = state
        .storage
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash).await? {
        return Err(ApiError::Unauthorized("Incorrect password"));
    }

    let token = state.tokens.issue(user.id)?;
    Ok(Json(TokenResponse { token }))
}

/// The authenticated user's own account
pub async fn get_user(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// Update handle, description and links of the caller's profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let handle = normalize_handle(&payload.handle);
    if handle.is_empty() {
        return Err(ApiError::Validation(vec![
            "handle must contain letters or digits".to_string(),
        ]));
    }
    if let Some(existing) = state.storage.find_user_by_handle(&handle).await? {
        if existing.id != user.id {
            return Err(ApiError::Conflict("Handle is not available".to_string()));
        }
    }

    let update = ProfileUpdate {
        handle,
        description: payload.description,
        links: payload.links,
    };
    let updated = state
        .storage
        .update_profile(user.id, &update)
        .await
        .map_err(|e| match e {
            StorageError::Conflict => ApiError::Conflict("Handle is not available".to_string()),
            other => other.into(),
        })?;
    if !updated {
        return Err(ApiError::NotFound("User does not exist".to_string()));
    }

    Ok(SuccessResponse::new("Profile updated"))
}

/// Upload a profile image from the multipart field `file`
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ImageResponse>, ApiError> {
    let max_bytes = state.config.media.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge(max_bytes)
            } else {
                ApiError::BadRequest(format!("Failed to read field: {}", e))
            }
        })?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }
        if data.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge(max_bytes));
        }

        let public_id = uuid::Uuid::new_v4().to_string();
        let image = state.media.upload(data.to_vec(), &public_id).await?;
        state.storage.set_image(user.id, &image).await?;

        info!(user_id = user.id, size = data.len(), "profile image uploaded");
        return Ok(Json(ImageResponse { image }));
    }

    Err(ApiError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

/// Public profile by handle
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    let user = state
        .storage
        .find_user_by_handle(&handle)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    Ok(Json(user.public_profile()))
}

/// Check whether a handle is still free
pub async fn search_handle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HandleSearchRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let handle = normalize_handle(&payload.handle);
    if handle.is_empty() {
        return Err(ApiError::Validation(vec![
            "handle must not be empty".to_string(),
        ]));
    }

    if state.storage.find_user_by_handle(&handle).await?.is_some() {
        return Err(ApiError::Conflict(format!("{handle} is already registered")));
    }

    Ok(SuccessResponse::new(format!("{handle} is available")))
}

/// Public profiles, newest first
pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProfilePage>, ApiError> {
    let limit = query.limit.clamp(1, 100);

    let before_id = match query.cursor.as_deref() {
        Some(cursor) => Some(
            state
                .cursors
                .verify(cursor)
                .map_err(|_| ApiError::BadRequest("Invalid cursor".to_string()))?
                .id,
        ),
        None => None,
    };

    // One extra row tells us whether another page exists.
    let mut profiles = state.storage.list_profiles(limit + 1, before_id).await?;
    let next_cursor = if profiles.len() as i64 > limit {
        profiles.truncate(limit as usize);
        match profiles.last() {
            Some(last) => Some(state.cursors.create(&CursorData { id: last.id })?),
            None => None,
        }
    } else {
        None
    };

    Ok(Json(ProfilePage {
        profiles,
        next_cursor,
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    SuccessResponse::new("OK")
}
