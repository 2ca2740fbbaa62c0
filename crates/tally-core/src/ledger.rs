//! Ledger service
//!
//! The application layer a front end talks to. It validates forms, scopes
//! every operation to the signed-in user and enforces rules the query
//! engine does not know about, such as refusing to delete a category that
//! still has expenses.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::models::{
    AuthData, Category, Expense, NewCategory, NewExpense, NewQuickExpense, QuickExpense,
    QuickExpenseWithCategory, UserPublic,
};
use crate::query::{Delete, Table};

/// Icon preselected for new categories
pub const DEFAULT_ICON: &str = "food";
/// Color preselected for new categories
pub const DEFAULT_COLOR: &str = "#FF7043";

/// Sign-up form as entered
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
            || self.full_name.is_empty()
        {
            return Err(Error::validation("form", "all fields are required"));
        }
        if self.password != self.confirm_password {
            return Err(Error::validation("password", "passwords do not match"));
        }
        if !is_plausible_email(&self.email) {
            return Err(Error::validation("email", "not a valid email address"));
        }
        Ok(())
    }
}

/// `local@domain.tld` with no whitespace and a single `@`
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}

/// Everything the main screen shows for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerData {
    /// Ordered by name
    pub categories: Vec<Category>,
    pub quick_expenses: Vec<QuickExpenseWithCategory>,
    /// Newest first
    pub expenses: Vec<Expense>,
}

impl LedgerData {
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }
}

/// User-scoped operations on top of a [`Client`]
#[derive(Clone)]
pub struct Ledger {
    client: Client,
}

impl Ledger {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<AuthData> {
        form.validate()?;
        self.client
            .auth()
            .sign_up(&form.email, &form.password, &form.full_name)
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthData> {
        if email.is_empty() || password.is_empty() {
            return Err(Error::validation("form", "email and password are required"));
        }
        self.client.auth().sign_in_with_password(email, password).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.client.auth().sign_out().await
    }

    /// The signed-in user
    pub async fn current_user(&self) -> Result<UserPublic> {
        self.client
            .auth()
            .get_session()
            .await
            .map(|s| s.user)
            .ok_or(Error::NoActiveSession)
    }

    /// Categories, quick-expenses and expenses of `user_id`
    pub async fn load(&self, user_id: &str) -> LedgerData {
        let data = LedgerData {
            categories: self.client.categories_for(user_id).await,
            quick_expenses: self.client.quick_expenses_for(user_id).await,
            expenses: self.client.expenses_for(user_id).await,
        };
        debug!(
            "Loaded {} categories, {} quick expenses, {} expenses for {}",
            data.categories.len(),
            data.quick_expenses.len(),
            data.expenses.len(),
            user_id
        );
        data
    }

    /// Data of the signed-in user
    pub async fn load_current(&self) -> Result<LedgerData> {
        let user = self.current_user().await?;
        Ok(self.load(&user.id).await)
    }

    /// Record an expense dated now. A missing or blank note becomes "Expense".
    pub async fn add_expense(
        &self,
        amount: Decimal,
        category_id: &str,
        note: Option<&str>,
    ) -> Result<Expense> {
        let user = self.current_user().await?;
        self.require_category(&user.id, category_id).await?;

        let mut new = NewExpense::new(&user.id, category_id, amount);
        if let Some(note) = note {
            new = new.note(note);
        }
        let expense = self.client.insert_expense(new).await?;
        info!("Expense added: {}", expense.id);
        Ok(expense)
    }

    /// Record an expense from a quick-expense template, noted with its name
    pub async fn add_quick_expense(&self, quick_expense_id: &str) -> Result<Expense> {
        let user = self.current_user().await?;
        let template = self
            .own_quick_expense(&user.id, quick_expense_id)
            .await
            .ok_or_else(|| Error::validation("quick expense", "not found"))?;

        let new = NewExpense::new(&user.id, &template.category_id, template.amount)
            .note(&template.name);
        let expense = self.client.insert_expense(new).await?;
        info!("Quick expense used: {} -> {}", template.id, expense.id);
        Ok(expense)
    }

    /// Delete one of the user's expenses; unknown ids remove nothing
    pub async fn delete_expense(&self, id: &str) -> Result<usize> {
        let user = self.current_user().await?;
        let owned = self
            .client
            .expenses_for(&user.id)
            .await
            .iter()
            .any(|e| e.id == id);
        if !owned {
            return Ok(0);
        }
        self.client.delete(&Delete::by_id(Table::Expenses, id)).await
    }

    pub async fn add_category(&self, name: &str, icon: &str, color: &str) -> Result<Category> {
        let user = self.current_user().await?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name", "please enter a category name"));
        }
        let category = self
            .client
            .insert_category(NewCategory::new(&user.id, name, icon, color))
            .await?;
        info!("Category added: {}", category.id);
        Ok(category)
    }

    /// Delete a category that no expense references
    pub async fn delete_category(&self, id: &str) -> Result<usize> {
        let user = self.current_user().await?;
        let in_use = self
            .client
            .expenses_for(&user.id)
            .await
            .iter()
            .filter(|e| e.category_id == id)
            .count();
        if in_use > 0 {
            return Err(Error::CategoryInUse {
                category_id: id.to_string(),
                count: in_use,
            });
        }

        let owned = self
            .client
            .categories_for(&user.id)
            .await
            .iter()
            .any(|c| c.id == id);
        if !owned {
            return Ok(0);
        }
        self.client.delete(&Delete::by_id(Table::Categories, id)).await
    }

    pub async fn add_quick_template(
        &self,
        name: &str,
        amount: Decimal,
        category_id: &str,
    ) -> Result<QuickExpense> {
        let user = self.current_user().await?;
        self.require_category(&user.id, category_id).await?;

        let template = self
            .client
            .insert_quick_expense(NewQuickExpense::new(&user.id, name.trim(), amount, category_id))
            .await?;
        info!("Quick expense added: {}", template.id);
        Ok(template)
    }

    pub async fn delete_quick_template(&self, id: &str) -> Result<usize> {
        let user = self.current_user().await?;
        if self.own_quick_expense(&user.id, id).await.is_none() {
            return Ok(0);
        }
        self.client
            .delete(&Delete::by_id(Table::QuickExpenses, id))
            .await
    }

    async fn require_category(&self, user_id: &str, category_id: &str) -> Result<()> {
        let exists = self
            .client
            .categories_for(user_id)
            .await
            .iter()
            .any(|c| c.id == category_id);
        if !exists {
            return Err(Error::validation("category", "select one of your categories"));
        }
        Ok(())
    }

    async fn own_quick_expense(&self, user_id: &str, id: &str) -> Option<QuickExpense> {
        self.client
            .quick_expenses_for(user_id)
            .await
            .into_iter()
            .map(|q| q.quick_expense)
            .find(|q| q.id == id)
    }
}
