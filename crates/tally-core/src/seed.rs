//! Default data for new accounts

use rust_decimal::Decimal;

use crate::models::{new_id, Category, QuickExpense};
use crate::query::Table;

/// (name, icon, color) of the categories every account starts with
const DEFAULT_CATEGORIES: [(&str, &str, &str); 6] = [
    ("Meals", "food", "#FF7043"),
    ("Coffee", "coffee", "#795548"),
    ("Transport", "bus", "#42A5F5"),
    ("Groceries", "cart", "#66BB6A"),
    ("Utilities", "lightbulb", "#FFC107"),
    ("Entertainment", "movie", "#AB47BC"),
];

/// (name, amount, category name) of the starter quick-expenses
const DEFAULT_QUICK_EXPENSES: [(&str, i64, &str); 2] = [("Coffee", 5, "Coffee"), ("Lunch", 15, "Meals")];

/// Starter categories and quick-expenses for `user_id`
///
/// Each quick-expense references the id of a category generated in the same
/// call.
pub fn default_data(user_id: &str) -> (Vec<Category>, Vec<QuickExpense>) {
    let categories: Vec<Category> = DEFAULT_CATEGORIES
        .iter()
        .map(|(name, icon, color)| Category {
            id: new_id(Table::Categories.id_prefix()),
            user_id: user_id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
        })
        .collect();

    let quick_expenses = DEFAULT_QUICK_EXPENSES
        .iter()
        .filter_map(|(name, amount, category_name)| {
            let category = categories.iter().find(|c| c.name == *category_name)?;
            Some(QuickExpense {
                id: new_id(Table::QuickExpenses.id_prefix()),
                user_id: user_id.to_string(),
                name: name.to_string(),
                amount: Decimal::new(*amount, 0),
                category_id: category.id.clone(),
            })
        })
        .collect();

    (categories, quick_expenses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_categories() {
        let (categories, _) = default_data("user-1");

        assert_eq!(categories.len(), 6);
        assert!(categories.iter().all(|c| c.user_id == "user-1"));

        let meals = categories.iter().find(|c| c.name == "Meals").unwrap();
        assert_eq!(meals.icon, "food");
        assert_eq!(meals.color, "#FF7043");

        let ids: HashSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_quick_expenses_reference_seeded_categories() {
        let (categories, quick) = default_data("user-1");

        assert_eq!(quick.len(), 2);

        let coffee = quick.iter().find(|q| q.name == "Coffee").unwrap();
        assert_eq!(coffee.amount, Decimal::new(5, 0));
        let target = categories.iter().find(|c| c.id == coffee.category_id).unwrap();
        assert_eq!(target.name, "Coffee");

        let lunch = quick.iter().find(|q| q.name == "Lunch").unwrap();
        assert_eq!(lunch.amount, Decimal::new(15, 0));
        let target = categories.iter().find(|c| c.id == lunch.category_id).unwrap();
        assert_eq!(target.name, "Meals");
    }

    #[test]
    fn test_each_call_generates_fresh_ids() {
        let (a, _) = default_data("user-1");
        let (b, _) = default_data("user-2");
        assert_ne!(a[0].id, b[0].id);
        assert_eq!(b[0].user_id, "user-2");
    }
}
