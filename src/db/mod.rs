//! Database layer (Firestore).
//!
//! The document store is the source of truth for user records. Services
//! depend on the [`UserStore`] trait so tests can swap in fakes.

pub mod firestore;

pub use firestore::FirestoreDb;

use crate::error::AppError;
use crate::models::{ProfileUpdate, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}

/// Unique field to look a user up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter<'a> {
    Id(&'a str),
    Email(&'a str),
    Username(&'a str),
}

impl UserFilter<'_> {
    /// Document field the filter matches on.
    pub fn field(&self) -> &'static str {
        match self {
            UserFilter::Id(_) => "id",
            UserFilter::Email(_) => "email",
            UserFilter::Username(_) => "username",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            UserFilter::Id(v) | UserFilter::Email(v) | UserFilter::Username(v) => v,
        }
    }
}

/// Document-store operations on user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the single user matching `filter`.
    async fn find_user(&self, filter: UserFilter<'_>) -> Result<Option<User>, AppError>;

    /// Apply a partial profile update and stamp `updated_at`.
    ///
    /// Returns the number of matched documents (0 or 1).
    async fn update_user(&self, id: &str, update: &ProfileUpdate) -> Result<u64, AppError>;

    /// Record the user's last activity time. Returns the matched count.
    async fn touch_last_active(&self, id: &str, at: DateTime<Utc>) -> Result<u64, AppError>;
}
