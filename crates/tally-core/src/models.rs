//! Data models for tally
//!
//! Defines the rows held by the data store: users, the current session,
//! categories, expenses and quick-expense templates, plus the payloads used
//! to insert them.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new opaque identifier, e.g. `exp-5f0c...`
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// A registered user as stored
///
/// Only the Argon2 hash of the password is kept. Never hand this type to
/// callers outside the crate; use [`UserPublic`].
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    /// PHC-formatted Argon2 hash
    pub password_hash: String,
    #[serde(default)]
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The user without credentials
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A user with the password removed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPublic {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// The currently authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub user: UserPublic,
}

impl Session {
    pub fn new(user: UserPublic) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Returned by sign-up and sign-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthData {
    pub user: UserPublic,
    pub session: Session,
}

/// A user-defined expense category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
}

/// Category payload without an id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCategory {
    pub user_id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
}

impl NewCategory {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        icon: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            icon: icon.into(),
            color: color.into(),
        }
    }
}

/// A recorded expense
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub note: String,
    pub date: DateTime<Utc>,
}

/// Expense payload without an id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewExpense {
    pub user_id: String,
    pub category_id: String,
    pub amount: Decimal,
    pub note: String,
    pub date: DateTime<Utc>,
}

impl NewExpense {
    /// Note used when none is given
    pub const DEFAULT_NOTE: &'static str = "Expense";

    /// Create an expense dated now with the default note
    pub fn new(user_id: impl Into<String>, category_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            category_id: category_id.into(),
            amount,
            note: Self::DEFAULT_NOTE.to_string(),
            date: Utc::now(),
        }
    }

    /// Set the note; blank notes keep the default
    pub fn note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        if !note.trim().is_empty() {
            self.note = note;
        }
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}

/// A one-tap expense template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickExpense {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub amount: Decimal,
    #[serde(alias = "category")]
    pub category_id: String,
}

/// Quick-expense payload without an id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewQuickExpense {
    pub user_id: String,
    pub name: String,
    pub amount: Decimal,
    pub category_id: String,
}

impl NewQuickExpense {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        amount: Decimal,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            amount,
            category_id: category_id.into(),
        }
    }
}

/// A quick-expense with its category embedded
///
/// `categories` is `None` when the referenced category no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickExpenseWithCategory {
    #[serde(flatten)]
    pub quick_expense: QuickExpense,
    pub categories: Option<Category>,
}
