use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

const MIN_PASSWORD_LEN: usize = 8;

/// Identity resolved from a live token: the stable opaque user id plus the
/// email it was registered under.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
}

struct Account {
    user_id: Uuid,
    password_hash: String,
}

/// Stand-in for the managed identity provider: email/password accounts with
/// Argon2id hashes and opaque bearer tokens. Sign-in failures are reported
/// without distinguishing unknown emails from wrong passwords.
pub struct Sessions {
    accounts: DashMap<String, Account>,
    tokens: DashMap<String, AuthUser>,
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            tokens: DashMap::new(),
        }
    }

    pub fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("a valid email is required".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password(password)?;
        let user_id = Uuid::new_v4();

        match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "an account for {email} already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Account {
                    user_id,
                    password_hash,
                });
                Ok(self.issue(user_id, &email))
            }
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = email.trim().to_ascii_lowercase();
        let (user_id, password_hash) = match self.accounts.get(&email) {
            Some(account) => (account.user_id, account.password_hash.clone()),
            None => {
                return Err(AppError::AuthFailed(
                    "unknown email or wrong password".to_string(),
                ));
            }
        };

        if !verify_password(password, &password_hash)? {
            return Err(AppError::AuthFailed(
                "unknown email or wrong password".to_string(),
            ));
        }

        Ok(self.issue(user_id, &email))
    }

    pub fn sign_out(&self, token: &str) {
        self.tokens.remove(token);
    }

    pub fn resolve(&self, token: &str) -> Option<AuthUser> {
        self.tokens.get(token).map(|entry| entry.value().clone())
    }

    fn issue(&self, user_id: Uuid, email: &str) -> Session {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(
            token.clone(),
            AuthUser {
                user_id,
                email: email.to_string(),
            },
        );

        Session {
            token,
            user_id,
            email: email.to_string(),
        }
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Internal(format!("password hashing failed: {err}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| AppError::Internal(format!("stored password hash is invalid: {err}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AppError::Internal(format!(
            "password verification failed: {err}"
        ))),
    }
}
