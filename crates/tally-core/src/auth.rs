//! Authentication
//!
//! Email and password accounts with a single current session. Passwords are
//! stored only as Argon2id hashes in PHC format.
//!
//! The session is either absent (logged out) or holds a public snapshot of
//! the signed-in user. Every transition is persisted before it is visible.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Error, Operation, Result};
use crate::models::{new_id, AuthData, Session, User, UserPublic};
use crate::seed;
use crate::storage::Collection;
use crate::store::DataStore;

/// Profile fields a signed-in user may change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl UserUpdate {
    /// Fields that identify or authenticate a user
    const PROTECTED: [&'static str; 4] = ["id", "password", "password_hash", "created_at"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.full_name.is_none()
    }

    /// Parse a JSON update, optionally wrapped as `{"data": {...}}`
    ///
    /// Protected fields are rejected with `ProtectedField`; any other field
    /// besides `email` and `full_name` is a validation error.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::validation("update", "expected a JSON object"))?;

        let fields = match object.get("data") {
            Some(Value::Object(inner)) if object.len() == 1 => inner,
            _ => object,
        };

        let mut update = Self::new();
        for (key, value) in fields {
            if Self::PROTECTED.contains(&key.as_str()) {
                return Err(Error::ProtectedField(key.clone()));
            }
            match key.as_str() {
                "email" => update.email = Some(string_field(key, value)?),
                "full_name" => update.full_name = Some(string_field(key, value)?),
                other => {
                    return Err(Error::validation(other, "not an updatable field"));
                }
            }
        }
        Ok(update)
    }
}

fn string_field(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::validation(key, "must be a string"))
}

/// Hash a password on the blocking pool
async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| Error::PasswordHash(e.to_string()))?
}

/// Hash checked when no account has the email, so an unknown email costs
/// the same as a wrong password
static DECOY_HASH: OnceCell<String> = OnceCell::const_new();

async fn decoy_hash() -> Option<&'static str> {
    DECOY_HASH
        .get_or_try_init(|| hash_password("decoy-password"))
        .await
        .ok()
        .map(String::as_str)
}

/// Check a password against a stored hash; malformed hashes never verify
async fn verify_password(password: &str, stored: &str) -> bool {
    let password = password.to_owned();
    let stored = stored.to_owned();
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&stored)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}

/// Auth handle returned by `Client::auth`
pub struct Auth<'a> {
    store: &'a DataStore,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(store: &'a DataStore) -> Self {
        Self { store }
    }

    /// Register an account, sign it in and seed its default data
    ///
    /// Emails are compared exactly. The user, session, categories and
    /// quick-expenses are persisted together; on failure none of them are
    /// visible.
    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<AuthData> {
        if self.email_taken(email).await {
            return Err(Error::DuplicateEmail);
        }

        let password_hash = hash_password(password).await?;
        let user = User {
            id: new_id("user"),
            email: email.to_string(),
            password_hash,
            full_name: full_name.to_string(),
            created_at: Utc::now(),
        };
        let (categories, quick_expenses) = seed::default_data(&user.id);

        let data = self
            .store
            .mutate(Operation::SignUp, move |c| {
                // Re-check under the write lock
                if c.users.iter().any(|u| u.email == user.email) {
                    return Err(Error::DuplicateEmail);
                }
                let public = user.public();
                let session = Session::new(public.clone());

                c.users.push(user);
                c.session = Some(session.clone());
                c.categories.extend(categories);
                c.quick_expenses.extend(quick_expenses);

                Ok(AuthData {
                    user: public,
                    session,
                })
            })
            .await?;

        info!("User signed up: {}", data.user.id);
        Ok(data)
    }

    /// Sign in with email and password
    ///
    /// An unknown email and a wrong password produce the same error.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthData> {
        let found = self
            .store
            .read(|c| {
                c.users
                    .iter()
                    .find(|u| u.email == email)
                    .map(|u| (u.id.clone(), u.password_hash.clone()))
            })
            .await;

        let Some((user_id, password_hash)) = found else {
            if let Some(hash) = decoy_hash().await {
                verify_password(password, hash).await;
            }
            debug!("Sign-in rejected");
            return Err(Error::InvalidCredentials);
        };
        if !verify_password(password, &password_hash).await {
            debug!("Sign-in rejected");
            return Err(Error::InvalidCredentials);
        }

        let data = self
            .store
            .mutate(Operation::SignIn, |c| {
                let public = c
                    .users
                    .iter()
                    .find(|u| u.id == user_id)
                    .map(User::public)
                    .ok_or(Error::InvalidCredentials)?;
                let session = Session::new(public.clone());
                c.session = Some(session.clone());
                Ok(AuthData {
                    user: public,
                    session,
                })
            })
            .await?;

        info!("User signed in: {}", data.user.id);
        Ok(data)
    }

    /// Clear the current session. Signing out while logged out succeeds.
    ///
    /// When memory holds no session the stored session key is removed
    /// anyway, in case it was left behind unread.
    pub async fn sign_out(&self) -> Result<()> {
        let signed_out = self
            .store
            .mutate(Operation::SignOut, |c| Ok(c.session.take()))
            .await?;

        match signed_out {
            Some(session) => info!("User signed out: {}", session.user_id()),
            None => {
                self.store
                    .resync(Operation::SignOut, Collection::Session)
                    .await?
            }
        }
        Ok(())
    }

    /// The current session, if any
    pub async fn get_session(&self) -> Option<Session> {
        self.store.read(|c| c.session.clone()).await
    }

    /// Update the signed-in user's profile
    pub async fn update_user(&self, update: UserUpdate) -> Result<UserPublic> {
        if let Some(email) = &update.email {
            if email.trim().is_empty() {
                return Err(Error::validation("email", "cannot be empty"));
            }
        }

        let user = self
            .store
            .mutate(Operation::UpdateUser, move |c| {
                let user_id = c
                    .session
                    .as_ref()
                    .map(|s| s.user_id().to_string())
                    .ok_or(Error::NoActiveSession)?;

                if let Some(email) = &update.email {
                    if c.users.iter().any(|u| u.email == *email && u.id != user_id) {
                        return Err(Error::DuplicateEmail);
                    }
                }

                let user = c
                    .users
                    .iter_mut()
                    .find(|u| u.id == user_id)
                    .ok_or(Error::UserNotFound)?;
                if let Some(email) = update.email {
                    user.email = email;
                }
                if let Some(full_name) = update.full_name {
                    user.full_name = full_name;
                }

                let public = user.public();
                c.session = Some(Session::new(public.clone()));
                Ok(public)
            })
            .await?;

        info!("User updated: {}", user.id);
        Ok(user)
    }

    async fn email_taken(&self, email: &str) -> bool {
        self.store
            .read(|c| c.users.iter().any(|u| u.email == email))
            .await
    }
}
