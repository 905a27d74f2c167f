//! Permission grants and auth transfer objects.

use std::collections::BTreeMap;

use bson::Bson;
use serde::{Deserialize, Serialize};

/// One authorization grant: an action on a scope, optionally narrowed by a
/// per-field resource constraint (field name → allowed values).
///
/// Never persisted standalone; always nested inside a role or a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub scope: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<BTreeMap<String, Vec<Bson>>>,
}

impl Permission {
    /// An unconstrained grant.
    pub fn new(scope: &str, action: &str) -> Self {
        Self {
            scope: scope.to_string(),
            action: action.to_string(),
            resource: None,
        }
    }

    /// Narrow the grant: restrict `field` to the given values.
    pub fn constrain<V: Into<Bson>>(mut self, field: &str, values: Vec<V>) -> Self {
        self.resource
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), values.into_iter().map(Into::into).collect());
        self
    }
}

/// The scopes known to the platform.
pub mod scopes {
    pub const AGENCIES: &str = "agencies";
    pub const ALERTS: &str = "alerts";
    pub const FILES: &str = "files";
    pub const MUNICIPALITIES: &str = "municipalities";
    pub const RIDES: &str = "rides";
    pub const ROLES: &str = "roles";
    pub const SESSIONS: &str = "sessions";
    pub const STOPS: &str = "stops";
    pub const USERS: &str = "users";
}

/// The actions a grant can name.
pub mod actions {
    pub const CREATE: &str = "create";
    pub const DELETE: &str = "delete";
    pub const LIST: &str = "list";
    pub const READ: &str = "read";
    pub const UPDATE: &str = "update";
}

/// Credentials presented at login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDto {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}
