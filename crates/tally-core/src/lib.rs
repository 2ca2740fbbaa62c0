//! Tally Core Library
//!
//! This crate provides the backend for tally, a local expense tracker:
//! accounts with a single current session, per-user categories, expenses
//! and one-tap quick-expense templates.
//!
//! # Architecture
//!
//! - **DataStore**: in-memory collections, the source of truth for reads
//! - **KeyValueStore**: durable mirror, one JSON value per collection
//!
//! Every mutation is persisted before it becomes visible in memory.
//!
//! # Quick Start
//!
//! ```text
//! let client = Client::with_file_store(config.data_dir, config.storage_keys());
//! client.initialize().await;
//!
//! let auth = client.auth().sign_up("alice@example.com", "pw", "Alice").await?;
//!
//! let ledger = Ledger::new(client);
//! let data = ledger.load(&auth.user.id).await;
//! ```
//!
//! # Modules
//!
//! - `client`: backend facade (main entry point)
//! - `auth`: sign-up, sign-in, sessions and profile updates
//! - `query`: select, insert and delete over the row tables
//! - `ledger`: user-scoped application service
//! - `report`: category breakdown, summaries and the text report
//! - `store`: in-memory collections and staged persistence
//! - `storage`: key-value port and adapters
//! - `config`: application configuration

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod query;
pub mod report;
pub mod seed;
pub mod storage;
pub mod store;

pub use auth::{Auth, UserUpdate};
pub use client::Client;
pub use config::Config;
pub use error::{Ack, ApiError, ApiResponse, Error, ErrorCode, Operation, Result};
pub use ledger::{Ledger, LedgerData, SignUpForm};
pub use models::{
    AuthData, Category, Expense, NewCategory, NewExpense, NewQuickExpense, QuickExpense,
    QuickExpenseWithCategory, Session, UserPublic,
};
pub use query::{Column, Delete, Filter, NewRow, Order, Row, Rows, Select, Table};
pub use report::{category_breakdown, to_fixed, CategoryTotal, ExpenseReport, Summary};
pub use storage::{
    Collection, FileStore, KeyValueStore, MemoryStore, StorageError, StorageKeys,
};
pub use store::{Collections, DataStore, HydrationFailure, HydrationReport};
