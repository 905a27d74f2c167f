//! Authentication and authorization.
//!
//! Session-token authentication against the session and user repositories,
//! and permission resolution merging role grants with direct user grants.

pub mod models;
pub mod password;
pub mod provider;
pub mod resolver;
pub mod token;

use thiserror::Error;

pub use models::{LoginDto, Permission, RegisterDto, actions, scopes};
pub use provider::AuthProvider;
pub use resolver::resolve_permission;

use crate::repository::RepoError;

/// Authentication and authorization errors.
///
/// `Unauthorized` (no valid session/user) and `Forbidden` (valid identity,
/// no matching grant) are distinct conditions and map to distinct API
/// statuses.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("forbidden: user does not have permission")]
    Forbidden,

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("password hash error: {0}")]
    Password(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("internal auth error: {0}")]
    Internal(String),
}
