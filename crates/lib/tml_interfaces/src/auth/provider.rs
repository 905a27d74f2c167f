//! Session-based authentication over the auth repositories.

use bson::doc;
use tracing::{debug, info};

use super::models::{LoginDto, Permission, RegisterDto};
use super::resolver::resolve_permission;
use super::{AuthError, password, token};
use crate::entities::{CreateSessionDto, CreateUserDto, Role, Session, UsersRepository};
use crate::repository::{RepoError, Repository};
use crate::store::StoreError;

/// Authentication provider: resolves session tokens to users and grants,
/// and manages the login/logout/register lifecycle.
///
/// Session `expires_at` is informational here; enforcing it is a caller
/// responsibility.
#[derive(Clone)]
pub struct AuthProvider {
    sessions: Repository<Session>,
    users: UsersRepository,
    roles: Repository<Role>,
}

impl AuthProvider {
    pub fn new(
        sessions: Repository<Session>,
        users: UsersRepository,
        roles: Repository<Role>,
    ) -> Self {
        Self {
            sessions,
            users,
            roles,
        }
    }

    /// The user behind a session token, password hash stripped.
    pub async fn get_user(&self, session_token: &str) -> Result<crate::entities::User, AuthError> {
        let session = self
            .sessions
            .find_one(doc! { "token": session_token })
            .await?
            .ok_or(AuthError::Unauthorized("session not found"))?;

        self.users
            .find_by_id(&session.user_id, false)
            .await?
            .ok_or(AuthError::Unauthorized("user not found"))
    }

    /// Resolve the effective permission a session token grants for
    /// `(scope, action)`; `Forbidden` when no grant matches.
    pub async fn get_permissions(
        &self,
        session_token: &str,
        scope: &str,
        action: &str,
    ) -> Result<Permission, AuthError> {
        let user = self.get_user(session_token).await?;
        let roles = self
            .roles
            .find_many(
                Some(doc! { "_id": { "$in": user.role_ids.clone() } }),
                None,
                None,
                None,
            )
            .await?;
        resolve_permission(&roles, &user, scope, action)
    }

    /// Whether the token grants `(scope, action)` at all.
    pub async fn has_permission(
        &self,
        session_token: &str,
        scope: &str,
        action: &str,
    ) -> Result<bool, AuthError> {
        match self.get_permissions(session_token, scope, action).await {
            Ok(_) => Ok(true),
            Err(AuthError::Forbidden) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Verify credentials and open a new session.
    pub async fn login(&self, dto: &LoginDto) -> Result<Session, AuthError> {
        let user = self
            .users
            .find_by_email(&dto.email, true)
            .await?
            .ok_or(AuthError::Unauthorized("user not found"))?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::Unauthorized("user has no password"))?;
        if !password::verify_password(&dto.password, hash)? {
            return Err(AuthError::Unauthorized("invalid password"));
        }

        let session = self.open_session(&user.id).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(session)
    }

    /// Delete the session behind a token; idempotent.
    pub async fn logout(&self, session_token: &str) -> Result<(), AuthError> {
        let deleted = self
            .sessions
            .delete_one(doc! { "token": session_token })
            .await?;
        debug!(deleted, "session closed");
        Ok(())
    }

    /// Create a user and open their first session. A duplicate email is a
    /// conflict, not an internal fault.
    pub async fn register(&self, dto: &RegisterDto) -> Result<Session, AuthError> {
        let create = CreateUserDto {
            email: dto.email.clone(),
            first_name: dto.first_name.clone(),
            last_name: dto.last_name.clone(),
            phone: dto.phone.clone(),
            password_hash: password::hash_password(&dto.password)?,
            permissions: Vec::new(),
            role_ids: Vec::new(),
            session_ids: Vec::new(),
        };

        let user_id = match self.users.insert_one(&create).await {
            Ok(id) => id,
            Err(RepoError::Store(StoreError::DuplicateKey(_))) => {
                return Err(AuthError::Conflict("user already exists"));
            }
            Err(other) => return Err(other.into()),
        };

        let session = self.open_session(&user_id).await?;
        info!(user_id = %user_id, "user registered");
        Ok(session)
    }

    async fn open_session(&self, user_id: &str) -> Result<Session, AuthError> {
        let session_id = self
            .sessions
            .insert_one(&CreateSessionDto {
                token: token::generate_session_token(),
                user_id: user_id.to_string(),
                expires_at: None,
            })
            .await?;
        self.sessions
            .find_by_id(&session_id)
            .await?
            .ok_or_else(|| AuthError::Internal("session vanished after insert".to_string()))
    }

    /// Not implemented yet; fails loudly instead of pretending to succeed.
    pub async fn reset_password(&self, _email: &str, _password: &str) -> Result<(), AuthError> {
        Err(AuthError::NotImplemented("reset_password"))
    }

    /// Not implemented yet; fails loudly instead of pretending to succeed.
    pub async fn verify_email(&self, _token: &str) -> Result<(), AuthError> {
        Err(AuthError::NotImplemented("verify_email"))
    }

    /// Not implemented yet; fails loudly instead of pretending to succeed.
    pub async fn send_verification_email(&self, _user_id: &str) -> Result<(), AuthError> {
        Err(AuthError::NotImplemented("send_verification_email"))
    }

    /// Not implemented yet; fails loudly instead of pretending to succeed.
    pub async fn send_password_reset_email(&self, _user_id: &str) -> Result<(), AuthError> {
        Err(AuthError::NotImplemented("send_password_reset_email"))
    }
}
