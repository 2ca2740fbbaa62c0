//! Storage key layout

use std::fmt;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "expense_tracker";

/// The five persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Session,
    Expenses,
    Categories,
    QuickExpenses,
}

impl Collection {
    /// Every collection, in hydration order
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Session,
        Collection::Expenses,
        Collection::Categories,
        Collection::QuickExpenses,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Session => "current_user",
            Collection::Expenses => "expenses",
            Collection::Categories => "categories",
            Collection::QuickExpenses => "quick_expenses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Users => "users",
            Collection::Session => "session",
            Collection::Expenses => "expenses",
            Collection::Categories => "categories",
            Collection::QuickExpenses => "quick expenses",
        };
        f.write_str(name)
    }
}

/// Namespaced key names for the persisted collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key under which `collection` is stored, e.g. `@expense_tracker_users`
    pub fn key(&self, collection: Collection) -> String {
        format!("@{}_{}", self.namespace, collection.suffix())
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let keys = StorageKeys::default();
        assert_eq!(keys.key(Collection::Users), "@expense_tracker_users");
        assert_eq!(keys.key(Collection::Session), "@expense_tracker_current_user");
        assert_eq!(
            keys.key(Collection::QuickExpenses),
            "@expense_tracker_quick_expenses"
        );
    }

    #[test]
    fn test_keys_are_distinct() {
        let keys = StorageKeys::new("t");
        let mut all: Vec<String> = Collection::ALL.iter().map(|c| keys.key(*c)).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 5);
    }
}
