//! End-to-end behavior of the backend client
//!
//! Run with: cargo test -p tally-core --test backend

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use tally_core::{
    Ack, ApiResponse, Client, Collection, Column, Error, ErrorCode, KeyValueStore, Ledger,
    MemoryStore, NewExpense, Rows, SignUpForm, StorageError, StorageKeys, Table,
};

type StorageResult<T> = std::result::Result<T, StorageError>;

/// Key-value store that can be told to fail writes
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<String>>,
}

impl FlakyStore {
    fn fail_writes_to(&self, key: String) {
        self.failing.lock().unwrap().insert(key);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(StorageError::Unavailable("disk detached".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key).await
    }
}

async fn client() -> Client {
    let client = Client::in_memory();
    client.initialize().await;
    client
}

#[tokio::test]
async fn test_sign_up_returns_id_without_password() {
    let client = client().await;

    let data = client
        .auth()
        .sign_up("alice@example.com", "pw123", "Alice")
        .await
        .unwrap();

    assert!(!data.user.id.is_empty());
    let json = serde_json::to_string(&ApiResponse::ok(data)).unwrap();
    assert!(!json.contains("pw123"));
    assert!(!json.contains("password"));
}

#[tokio::test]
async fn test_duplicate_email_keeps_user_count() {
    let client = client().await;
    let auth = client.auth();

    auth.sign_up("alice@example.com", "pw123", "Alice").await.unwrap();
    let second = auth.sign_up("alice@example.com", "other", "Impostor").await;

    assert!(matches!(second, Err(Error::DuplicateEmail)));
    let users = client.store().read(|c| c.users.len()).await;
    assert_eq!(users, 1);
}

#[tokio::test]
async fn test_sign_in_failures_are_indistinguishable() {
    let client = client().await;
    let auth = client.auth();
    auth.sign_up("alice@example.com", "pw123", "Alice").await.unwrap();
    auth.sign_out().await.unwrap();

    let wrong_password: ApiResponse<_> = auth
        .sign_in_with_password("alice@example.com", "nope")
        .await
        .into();
    let unknown_email: ApiResponse<_> = auth
        .sign_in_with_password("bob@example.com", "pw123")
        .await
        .into();

    assert_eq!(wrong_password, unknown_email);
    assert_eq!(
        wrong_password.error.map(|e| e.code),
        Some(ErrorCode::InvalidCredentials)
    );
    assert!(auth.get_session().await.is_none());

    let ok = auth.sign_in_with_password("alice@example.com", "pw123").await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_seeded_categories_and_enriched_quick_expenses() {
    let client = client().await;
    let user = client
        .auth()
        .sign_up("alice@example.com", "pw123", "Alice")
        .await
        .unwrap()
        .user;

    let categories = client.categories_for(&user.id).await;
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Coffee", "Entertainment", "Groceries", "Meals", "Transport", "Utilities"]
    );

    let query = client
        .from(Table::QuickExpenses)
        .select()
        .eq(Column::UserId, &user.id);
    let Rows::QuickExpenses(quick) = client.select(&query).await else {
        panic!("expected quick expense rows");
    };
    assert_eq!(quick.len(), 2);
    for q in &quick {
        let category = q.categories.as_ref().expect("category embedded");
        assert_eq!(category.id, q.quick_expense.category_id);
    }
}

#[tokio::test]
async fn test_new_expense_is_listed_first() {
    let client = client().await;
    let user = client
        .auth()
        .sign_up("alice@example.com", "pw123", "Alice")
        .await
        .unwrap()
        .user;
    let category = client.categories_for(&user.id).await.remove(0);

    let yesterday = Utc::now() - Duration::days(1);
    client
        .insert_expense(
            NewExpense::new(&user.id, &category.id, Decimal::new(3, 0)).date(yesterday),
        )
        .await
        .unwrap();
    let newest = client
        .insert_expense(NewExpense::new(&user.id, &category.id, Decimal::new(7, 0)))
        .await
        .unwrap();

    let query = client
        .from(Table::Expenses)
        .select()
        .eq(Column::UserId, &user.id)
        .order(Column::Date, false);
    let Rows::Expenses(expenses) = client.select(&query).await else {
        panic!("expected expense rows");
    };
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].id, newest.id);
}

#[tokio::test]
async fn test_category_delete_guard() {
    let ledger = Ledger::new(client().await);
    ledger
        .sign_up(&SignUpForm {
            email: "alice@example.com".to_string(),
            password: "pw123".to_string(),
            confirm_password: "pw123".to_string(),
            full_name: "Alice".to_string(),
        })
        .await
        .unwrap();
    let data = ledger.load_current().await.unwrap();
    let transport = data.categories.iter().find(|c| c.name == "Transport").unwrap();
    let meals = data.categories.iter().find(|c| c.name == "Meals").unwrap();

    assert_eq!(ledger.delete_category(&transport.id).await.unwrap(), 1);
    let data = ledger.load_current().await.unwrap();
    assert!(data.category(&transport.id).is_none());

    ledger
        .add_expense(Decimal::new(9, 0), &meals.id, Some("Dinner"))
        .await
        .unwrap();
    let rejected = ledger.delete_category(&meals.id).await;
    assert!(matches!(rejected, Err(Error::CategoryInUse { count: 1, .. })));
    let data = ledger.load_current().await.unwrap();
    assert!(data.category(&meals.id).is_some());
}

#[tokio::test]
async fn test_restart_round_trip_with_file_store() {
    let temp = TempDir::new().unwrap();

    let before = {
        let client = Client::with_file_store(temp.path(), StorageKeys::default());
        client.initialize().await;
        let user = client
            .auth()
            .sign_up("alice@example.com", "pw123", "Alice")
            .await
            .unwrap()
            .user;
        let category = client.categories_for(&user.id).await.remove(0);
        client
            .insert_expense(
                NewExpense::new(&user.id, &category.id, Decimal::new(1250, 2)).note("Lunch"),
            )
            .await
            .unwrap();
        client.store().snapshot().await
    };

    let restarted = Client::with_file_store(temp.path(), StorageKeys::default());
    let report = restarted.initialize().await;

    assert!(report.is_clean());
    assert_eq!(report.loaded.len(), 5);
    assert_eq!(restarted.store().snapshot().await, before);
}

#[tokio::test]
async fn test_sign_out_is_idempotent() {
    let client = client().await;
    let auth = client.auth();
    auth.sign_up("alice@example.com", "pw123", "Alice").await.unwrap();

    auth.sign_out().await.unwrap();
    assert!(auth.get_session().await.is_none());

    let again = ApiResponse::from_unit(auth.sign_out().await);
    assert_eq!(again.data, Some(Ack {}));
    assert!(again.error.is_none());
    assert!(auth.get_session().await.is_none());
}

#[tokio::test]
async fn test_alice_scenario() {
    let client = client().await;
    let data = client
        .auth()
        .sign_up("alice@example.com", "pw123", "Alice")
        .await
        .unwrap();
    assert_eq!(data.session.user_id(), data.user.id);

    let meals = client
        .categories_for(&data.user.id)
        .await
        .into_iter()
        .find(|c| c.name == "Meals")
        .unwrap();
    client
        .insert_expense(
            NewExpense::new(&data.user.id, &meals.id, "12.5".parse().unwrap()).note("Lunch"),
        )
        .await
        .unwrap();

    let expenses = client.expenses_for(&data.user.id).await;
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, Decimal::new(125, 1));
    assert_eq!(expenses[0].note, "Lunch");
}

#[tokio::test]
async fn test_write_failure_leaves_memory_unchanged() {
    let keys = StorageKeys::default();
    let kv = Arc::new(FlakyStore::default());
    let client = Client::new(kv.clone(), keys.clone());
    client.initialize().await;

    let user = client
        .auth()
        .sign_up("alice@example.com", "pw123", "Alice")
        .await
        .unwrap()
        .user;
    let category = client.categories_for(&user.id).await.remove(0);

    kv.fail_writes_to(keys.key(Collection::Expenses));
    let result = client
        .insert_expense(NewExpense::new(&user.id, &category.id, Decimal::new(5, 0)))
        .await;

    let error = result.unwrap_err();
    assert_eq!(error.code(), ErrorCode::StorageWriteFailure);
    assert_eq!(error.public_message(), "Failed to add expense");
    assert!(client.expenses_for(&user.id).await.is_empty());

    // Nothing reached storage either, so a restart agrees with memory
    let restarted = Client::new(kv.clone(), keys);
    restarted.initialize().await;
    assert!(restarted.expenses_for(&user.id).await.is_empty());
    assert_eq!(restarted.categories_for(&user.id).await.len(), 6);
}

#[tokio::test]
async fn test_failed_sign_up_leaves_no_partial_account() {
    let keys = StorageKeys::default();
    let kv = Arc::new(FlakyStore::default());
    kv.fail_writes_to(keys.key(Collection::QuickExpenses));
    let client = Client::new(kv.clone(), keys.clone());
    client.initialize().await;

    let result: ApiResponse<_> = client
        .auth()
        .sign_up("alice@example.com", "pw123", "Alice")
        .await
        .into();

    let error = result.error.unwrap();
    assert_eq!(error.message, "Failed to create account. Please try again.");
    assert!(client.auth().get_session().await.is_none());
    assert_eq!(client.store().snapshot().await, Default::default());

    let restarted = Client::new(kv, keys);
    restarted.initialize().await;
    assert!(restarted.store().read(|c| c.users.is_empty()).await);
}

#[tokio::test]
async fn test_corrupt_collection_does_not_block_startup() {
    let keys = StorageKeys::default();
    let kv = MemoryStore::with_entries([(keys.key(Collection::Expenses), "[{\"id\":")]);
    let client = Client::new(Arc::new(kv), keys);

    let report = client.initialize().await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].collection, Collection::Expenses);
    let signed_up = client.auth().sign_up("alice@example.com", "pw123", "Alice").await;
    assert!(signed_up.is_ok());
}

#[tokio::test]
async fn test_concurrent_inserts_are_not_lost() {
    let client = client().await;
    let user = client
        .auth()
        .sign_up("alice@example.com", "pw123", "Alice")
        .await
        .unwrap()
        .user;
    let category = client.categories_for(&user.id).await.remove(0);

    let mut handles = Vec::new();
    for i in 1..=20 {
        let client = client.clone();
        let new = NewExpense::new(&user.id, &category.id, Decimal::new(i, 0));
        handles.push(tokio::spawn(async move { client.insert_expense(new).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(client.expenses_for(&user.id).await.len(), 20);
}
