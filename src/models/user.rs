//! User model for storage, cache, and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Role {
    User,
    Admin,
    Staff,
    Seller,
}

/// User record stored in Firestore and cached as JSON.
///
/// The cached copy carries every field, including `hashed_password`;
/// API responses go through [`UserResponse`] instead.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Document ID
    pub id: String,
    /// Unique email (primary lookup key)
    pub email: String,
    /// Unique username (secondary lookup key)
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    /// Profile picture URL
    #[serde(default)]
    pub profile_image: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    /// Set by the document store on every profile update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Best-effort activity timestamp
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

impl User {
    /// Username to index under, if it is set and non-empty.
    pub fn username_key(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.is_empty())
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("roles", &self.roles)
            .field("hashed_password", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Partial profile update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(url)]
    pub profile_image: Option<String>,
    #[validate(length(min = 3, max = 30))]
    pub username: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Document field names this update writes.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.full_name.is_some() {
            fields.push("full_name");
        }
        if self.bio.is_some() {
            fields.push("bio");
        }
        if self.profile_image.is_some() {
            fields.push("profile_image");
        }
        if self.username.is_some() {
            fields.push("username");
        }
        fields
    }

    /// Merge the set fields into `user`.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(bio) = &self.bio {
            user.bio = bio.clone();
        }
        if let Some(profile_image) = &self.profile_image {
            user.profile_image = profile_image.clone();
        }
        if let Some(username) = &self.username {
            user.username = Some(username.clone());
        }
    }
}

/// Public view of a user. Never includes the password hash.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub full_name: String,
    pub roles: Vec<Role>,
    pub bio: String,
    pub profile_image: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            roles: user.roles,
            bio: user.bio,
            profile_image: user.profile_image,
        }
    }
}
