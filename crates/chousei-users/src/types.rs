use serde::{Deserialize, Serialize};

/// A user as known to this service: whatever the identity provider last
/// told us at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// External provider id (e.g. a GitHub numeric id, kept as text).
    pub user_id: String,
    pub username: String,
}
