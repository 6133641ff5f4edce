//! Admin accounts and expiring session tokens.
//!
//! Passwords are stored as Argon2id PHC strings. A successful login yields an
//! opaque bearer token that the server checks on every admin request.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

use crate::repository::{AdminUser, UserRepository};
use crate::validation::failed_fields;
use crate::{Result, ShopError};

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUserForm {
    #[validate(length(min = 3, max = 32), custom = "crate::validation::not_blank")]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(must_match = "password")]
    pub confirm_password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginForm { pub username: String, pub password: String }

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default().hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ShopError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).map_or(false, |parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Validates the form and stores a new admin user. The username is trimmed before validation.
pub async fn create_user(users: &dyn UserRepository, form: &NewUserForm) -> Result<AdminUser> {
    let form = NewUserForm { username: form.username.trim().to_string(), ..form.clone() };
    form.validate().map_err(|e| ShopError::Validation(failed_fields(&e)))?;
    let username = form.username.clone();
    if users.find_by_username(&username).await?.is_some() { return Err(ShopError::UserExists); }
    let user = AdminUser { id: Uuid::now_v7(), username, password_hash: hash_password(&form.password)?, created_at: Utc::now() };
    users.insert(&user).await?;
    tracing::info!(username = %user.username, "admin user created");
    Ok(user)
}

/// Deletes an admin user. Admins cannot delete the account they are signed in with.
pub async fn delete_user(users: &dyn UserRepository, id: Uuid, acting: &Session) -> Result<()> {
    let target = users.list().await?.into_iter().find(|u| u.id == id).ok_or(ShopError::UserNotFound)?;
    if target.username == acting.username { return Err(ShopError::Forbidden("cannot delete your own account".into())); }
    users.delete(id).await?;
    tracing::info!(username = %target.username, by = %acting.username, "admin user deleted");
    Ok(())
}

/// In-process session table.
pub struct SessionManager {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self { Self { ttl, sessions: RwLock::new(HashMap::new()) } }

    pub async fn login(&self, users: &dyn UserRepository, form: &LoginForm) -> Result<Session> {
        let user = users.find_by_username(form.username.trim()).await?;
        match user {
            Some(u) if verify_password(&form.password, &u.password_hash) => self.issue(&u.username, Utc::now()),
            _ => {
                tracing::warn!(username = %form.username, "rejected admin login");
                Err(ShopError::InvalidCredentials)
            }
        }
    }

    pub fn issue(&self, username: &str, now: DateTime<Utc>) -> Result<Session> {
        let session = Session { token: new_token(), username: username.to_string(), issued_at: now, expires_at: now + self.ttl };
        let mut sessions = self.sessions.write().map_err(|_| ShopError::Internal("session table poisoned".into()))?;
        sessions.retain(|_, s| !s.is_expired_at(now));
        sessions.insert(session.token.clone(), session.clone());
        drop(sessions);
        tracing::info!(username, expires_at = %session.expires_at, "admin session issued");
        Ok(session)
    }

    pub fn verify(&self, token: &str) -> Result<Session> { self.verify_at(token, Utc::now()) }

    /// Expired tokens are evicted on sight.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session> {
        let mut sessions = self.sessions.write().map_err(|_| ShopError::Internal("session table poisoned".into()))?;
        let session = sessions.get(token).cloned().ok_or_else(|| ShopError::Unauthorized("unknown session".into()))?;
        if session.is_expired_at(now) {
            sessions.remove(token);
            return Err(ShopError::Unauthorized("session expired".into()));
        }
        Ok(session)
    }

    pub fn revoke(&self, token: &str) -> Result<()> {
        self.sessions.write().map_err(|_| ShopError::Internal("session table poisoned".into()))?.remove(token);
        Ok(())
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;

    fn form(username: &str, password: &str, confirm: &str) -> NewUserForm {
        NewUserForm { username: username.into(), password: password.into(), confirm_password: confirm.into() }
    }

    #[tokio::test]
    async fn test_create_and_login() {
        let store = MemoryStore::new();
        let user = create_user(&store, &form("manager", "s3cret-pass", "s3cret-pass")).await.unwrap();
        assert_ne!(user.password_hash, "s3cret-pass");

        let sessions = SessionManager::new(Duration::minutes(30));
        let session = sessions.login(&store, &LoginForm { username: "manager".into(), password: "s3cret-pass".into() }).await.unwrap();
        assert_eq!(session.token.len(), 64);
        assert_eq!(sessions.verify(&session.token).unwrap().username, "manager");

        let wrong = sessions.login(&store, &LoginForm { username: "manager".into(), password: "nope".into() }).await;
        assert!(matches!(wrong, Err(ShopError::InvalidCredentials)));
        let unknown = sessions.login(&store, &LoginForm { username: "ghost".into(), password: "s3cret-pass".into() }).await;
        assert!(matches!(unknown, Err(ShopError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_user_form_rules() {
        let store = MemoryStore::new();
        match create_user(&store, &form("ab", "short", "other")).await {
            Err(ShopError::Validation(fields)) => assert_eq!(fields, vec!["confirm_password", "password", "username"]),
            other => panic!("expected validation error, got {other:?}"),
        }
        create_user(&store, &form("manager", "password1", "password1")).await.unwrap();
        assert!(matches!(create_user(&store, &form("manager", "password2", "password2")).await, Err(ShopError::UserExists)));
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let store = MemoryStore::new();
        let me = create_user(&store, &form("manager", "password1", "password1")).await.unwrap();
        let other = create_user(&store, &form("clerk", "password2", "password2")).await.unwrap();
        let sessions = SessionManager::new(Duration::minutes(5));
        let session = sessions.issue("manager", Utc::now()).unwrap();

        assert!(matches!(delete_user(&store, me.id, &session).await, Err(ShopError::Forbidden(_))));
        delete_user(&store, other.id, &session).await.unwrap();
        assert!(matches!(delete_user(&store, other.id, &session).await, Err(ShopError::UserNotFound)));
    }

    #[test]
    fn test_session_expiry_and_revocation() {
        let sessions = SessionManager::new(Duration::minutes(10));
        let t0 = Utc::now();
        let s = sessions.issue("manager", t0).unwrap();
        assert!(sessions.verify_at(&s.token, t0 + Duration::minutes(9)).is_ok());
        assert!(matches!(sessions.verify_at(&s.token, t0 + Duration::minutes(10)), Err(ShopError::Unauthorized(_))));
        assert!(sessions.verify_at(&s.token, t0).is_err());

        let s = sessions.issue("manager", t0).unwrap();
        sessions.revoke(&s.token).unwrap();
        assert!(sessions.verify_at(&s.token, t0).is_err());
    }

    #[test]
    fn test_issue_sweeps_expired_sessions() {
        let sessions = SessionManager::new(Duration::minutes(1));
        let stale = Utc::now() - Duration::days(1);
        for _ in 0..100 {
            sessions.issue("manager", stale).unwrap();
        }
        let fresh = sessions.issue("manager", Utc::now()).unwrap();
        let table = sessions.sessions.read().unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key(&fresh.token));
    }

    #[tokio::test]
    async fn test_username_length_counts_trimmed_value() {
        let store = MemoryStore::new();
        match create_user(&store, &form("  ab  ", "password1", "password1")).await {
            Err(ShopError::Validation(fields)) => assert_eq!(fields, vec!["username"]),
            other => panic!("expected validation error, got {other:?}"),
        }
        let user = create_user(&store, &form("  clerk ", "password1", "password1")).await.unwrap();
        assert_eq!(user.username, "clerk");
    }
}
