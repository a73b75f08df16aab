// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod best_effort;
pub mod identity;
pub mod streak;

pub use identity::{IdentityCache, LookupKey};
pub use streak::StreakEngine;
