//! Backend client
//!
//! `Client` is the single entry point the presentation layer uses. It wraps
//! one shared [`DataStore`] and hands out the auth and query surfaces.

use std::sync::Arc;

use crate::auth::Auth;
use crate::error::Result;
use crate::models::{
    Category, Expense, NewCategory, NewExpense, NewQuickExpense, QuickExpense,
    QuickExpenseWithCategory,
};
use crate::query::{
    Column, Delete, Engine, Filter, NewRow, Order, QueryBuilder, Row, Rows, Select, Table,
};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageKeys};
use crate::store::{DataStore, HydrationReport};

/// Handle to the mock backend. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    store: Arc<DataStore>,
}

impl Client {
    pub fn new(kv: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        Self {
            store: Arc::new(DataStore::new(kv, keys)),
        }
    }

    /// Client backed by JSON files in `dir`
    pub fn with_file_store(dir: impl Into<std::path::PathBuf>, keys: StorageKeys) -> Self {
        Self::new(Arc::new(FileStore::new(dir)), keys)
    }

    /// Client backed by a process-local map
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), StorageKeys::default())
    }

    /// Load persisted collections; call once before serving requests
    pub async fn initialize(&self) -> HydrationReport {
        self.store.initialize().await
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth::new(&self.store)
    }

    /// Start building a request against `table`
    pub fn from(&self, table: Table) -> QueryBuilder {
        QueryBuilder::new(table)
    }

    pub async fn select(&self, query: &Select) -> Rows {
        Engine::new(&self.store).select(query).await
    }

    /// Insert a row and return it as stored
    pub async fn insert(&self, row: NewRow) -> Result<Row> {
        Engine::new(&self.store).insert(row).await
    }

    /// Delete matching rows, returning how many were removed
    pub async fn delete(&self, query: &Delete) -> Result<usize> {
        Engine::new(&self.store).delete(query).await
    }

    /// Categories owned by `user_id`, ordered by name
    pub async fn categories_for(&self, user_id: &str) -> Vec<Category> {
        let order = Order {
            column: Column::Name,
            ascending: true,
        };
        Engine::new(&self.store)
            .select_as(&Filter::eq(Column::UserId, user_id), Some(&order))
            .await
    }

    /// Expenses owned by `user_id`, newest first
    pub async fn expenses_for(&self, user_id: &str) -> Vec<Expense> {
        let order = Order {
            column: Column::Date,
            ascending: false,
        };
        Engine::new(&self.store)
            .select_as(&Filter::eq(Column::UserId, user_id), Some(&order))
            .await
    }

    /// Quick-expenses owned by `user_id`, each with its category
    pub async fn quick_expenses_for(&self, user_id: &str) -> Vec<QuickExpenseWithCategory> {
        let query = self.from(Table::QuickExpenses).select().eq(Column::UserId, user_id);
        match self.select(&query).await {
            Rows::QuickExpenses(rows) => rows,
            _ => Vec::new(),
        }
    }

    pub async fn insert_category(&self, new: NewCategory) -> Result<Category> {
        Engine::new(&self.store).insert_as(new).await
    }

    pub async fn insert_expense(&self, new: NewExpense) -> Result<Expense> {
        Engine::new(&self.store).insert_as(new).await
    }

    pub async fn insert_quick_expense(&self, new: NewQuickExpense) -> Result<QuickExpense> {
        Engine::new(&self.store).insert_as(new).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_insert_select_delete() {
        let client = Client::in_memory();
        client.initialize().await;

        let row = client
            .insert(NewRow::Category(NewCategory::new("user-1", "Books", "book", "#123456")))
            .await
            .unwrap();
        assert!(row.id().starts_with("cat-"));

        let query = client.from(Table::Categories).select().eq(Column::UserId, "user-1");
        assert_eq!(client.select(&query).await.len(), 1);

        let removed = client
            .delete(&client.from(Table::Categories).delete().eq(Column::Id, row.id()))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(client.select(&query).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_ok() {
        let client = Client::in_memory();
        let removed = client
            .delete(&Delete::by_id(Table::Expenses, "exp-missing"))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_typed_helpers_filter_by_user() {
        let client = Client::in_memory();
        client
            .insert_expense(NewExpense::new("user-1", "cat-1", Decimal::new(5, 0)))
            .await
            .unwrap();
        client
            .insert_expense(NewExpense::new("user-2", "cat-1", Decimal::new(7, 0)))
            .await
            .unwrap();

        let mine = client.expenses_for("user-1").await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].amount, Decimal::new(5, 0));
    }

    #[tokio::test]
    async fn test_rejected_insert_is_not_stored() {
        let client = Client::in_memory();
        let result = client
            .insert_quick_expense(NewQuickExpense::new("user-1", "Tea", Decimal::new(-1, 0), "cat-1"))
            .await;
        assert!(result.is_err());
        assert!(client.quick_expenses_for("user-1").await.is_empty());
    }
}
