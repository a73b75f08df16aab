// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ProfileUpdate, StreakInfo, UserResponse};
use crate::services::best_effort;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/api/v1/@me", get(get_me).put(update_me))
        .route("/user/api/v1/streak", get(get_streak).post(record_activity))
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user profile.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(auth.user))
}

/// Update the current user's profile.
///
/// The document store is written first, then both cache keys are refreshed
/// from the merged record.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>> {
    update.validate()?;

    let updated = state.identity.update_profile(&auth.user, &update).await?;
    Ok(Json(UserResponse::from(updated)))
}

// ─── Streaks ─────────────────────────────────────────────────

/// Get the current user's streak.
async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<StreakInfo>> {
    let streak = state.streaks.get_streak(&auth.user.id).await?;
    Ok(Json(streak))
}

/// Count today's activity toward the user's streak.
///
/// Also bumps `last_active` on the profile, fire-and-forget.
async fn record_activity(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<StreakInfo>> {
    let now = chrono::Utc::now();
    let streak = state
        .streaks
        .record_activity(&auth.user.id, now.date_naive())
        .await?;

    let users = state.users.clone();
    let user_id = auth.user.id;
    best_effort::spawn_logged("touch_last_active", async move {
        users.touch_last_active(&user_id, now).await.map(|_| ())
    });

    Ok(Json(streak))
}
