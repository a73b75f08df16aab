// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod streak;
pub mod user;

pub use streak::{StreakInfo, StreakRecord, StreakTransition};
pub use user::{ProfileUpdate, Role, User, UserResponse};
