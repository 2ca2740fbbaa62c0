//! Query engine
//!
//! A small row-store interface over the in-memory collections. Requests are
//! plain values (`Select`, `Delete`, `NewRow`) so they can be built, logged
//! and tested without a running store:
//!
//! ```ignore
//! let query = client
//!     .from(Table::Expenses)
//!     .select()
//!     .eq(Column::UserId, &user.id)
//!     .order(Column::Date, false);
//! let rows = client.select(&query).await;
//! ```
//!
//! Every table goes through the same generic core, driven by the [`Record`]
//! trait each row type implements.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Operation, Result};
use crate::models::{
    new_id, Category, Expense, NewCategory, NewExpense, NewQuickExpense, QuickExpense,
    QuickExpenseWithCategory,
};
use crate::store::{Collections, DataStore};

/// The queryable tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Categories,
    Expenses,
    QuickExpenses,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Categories, Table::Expenses, Table::QuickExpenses];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Categories => "categories",
            Table::Expenses => "expenses",
            Table::QuickExpenses => "quick_expenses",
        }
    }

    /// Row noun used in user-facing messages
    pub fn singular(&self) -> &'static str {
        match self {
            Table::Categories => "category",
            Table::Expenses => "expense",
            Table::QuickExpenses => "quick expense",
        }
    }

    /// Prefix of generated row ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Table::Categories => "cat",
            Table::Expenses => "exp",
            Table::QuickExpenses => "qe",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            Table::Categories => &[
                Column::Id,
                Column::UserId,
                Column::Name,
                Column::Icon,
                Column::Color,
            ],
            Table::Expenses => &[
                Column::Id,
                Column::UserId,
                Column::CategoryId,
                Column::Amount,
                Column::Note,
                Column::Date,
            ],
            Table::QuickExpenses => &[
                Column::Id,
                Column::UserId,
                Column::Name,
                Column::Amount,
                Column::CategoryId,
            ],
        }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns().contains(&column)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Table::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| Error::validation("table", format!("unknown table '{}'", s)))
    }
}

/// Column names across all tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    UserId,
    CategoryId,
    Name,
    Icon,
    Color,
    Amount,
    Note,
    Date,
}

impl Column {
    const ALL: [Column; 9] = [
        Column::Id,
        Column::UserId,
        Column::CategoryId,
        Column::Name,
        Column::Icon,
        Column::Color,
        Column::Amount,
        Column::Note,
        Column::Date,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::UserId => "user_id",
            Column::CategoryId => "category_id",
            Column::Name => "name",
            Column::Icon => "icon",
            Column::Color => "color",
            Column::Amount => "amount",
            Column::Note => "note",
            Column::Date => "date",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Column::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| Error::validation("column", format!("unknown column '{}'", s)))
    }
}

/// A typed column value borrowed from a row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Text(&'a str),
    Amount(Decimal),
    Date(DateTime<Utc>),
}

impl Value<'_> {
    /// True when this value equals the textual filter operand
    ///
    /// Amounts compare numerically (`"5"` matches `5.00`) and dates compare
    /// as instants given in RFC 3339.
    fn matches(&self, operand: &str) -> bool {
        match self {
            Value::Text(text) => *text == operand,
            Value::Amount(amount) => operand
                .parse::<Decimal>()
                .map(|d| d == *amount)
                .unwrap_or(false),
            Value::Date(date) => DateTime::parse_from_rfc3339(operand)
                .map(|d| d.with_timezone(&Utc) == *date)
                .unwrap_or(false),
        }
    }

    fn compare(&self, other: &Value<'_>) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => collation_key(a)
                .cmp(&collation_key(b))
                .then_with(|| a.cmp(b)),
            (Value::Amount(a), Value::Amount(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            // Values of one column always share a variant
            _ => Ordering::Equal,
        }
    }
}

/// Sort key approximating locale-aware, case- and accent-insensitive order
pub fn collation_key(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A row type stored in one table
pub trait Record: Clone + Send + Sync + 'static {
    /// Insert payload
    type New: Send;

    const TABLE: Table;

    fn id(&self) -> &str;

    /// Value of `column`, or `None` when the table has no such column
    fn value(&self, column: Column) -> Option<Value<'_>>;

    /// Validate `new` and build the stored row
    fn from_new(id: String, new: Self::New) -> Result<Self>;

    fn rows(collections: &Collections) -> &Vec<Self>;

    fn rows_mut(collections: &mut Collections) -> &mut Vec<Self>;
}

fn require_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation("amount", "must be greater than zero"));
    }
    Ok(())
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "cannot be empty"));
    }
    Ok(())
}

impl Record for Category {
    type New = NewCategory;

    const TABLE: Table = Table::Categories;

    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, column: Column) -> Option<Value<'_>> {
        match column {
            Column::Id => Some(Value::Text(&self.id)),
            Column::UserId => Some(Value::Text(&self.user_id)),
            Column::Name => Some(Value::Text(&self.name)),
            Column::Icon => Some(Value::Text(&self.icon)),
            Column::Color => Some(Value::Text(&self.color)),
            _ => None,
        }
    }

    fn from_new(id: String, new: NewCategory) -> Result<Self> {
        require_name(&new.name)?;
        Ok(Category {
            id,
            user_id: new.user_id,
            name: new.name,
            icon: new.icon,
            color: new.color,
        })
    }

    fn rows(collections: &Collections) -> &Vec<Self> {
        &collections.categories
    }

    fn rows_mut(collections: &mut Collections) -> &mut Vec<Self> {
        &mut collections.categories
    }
}

impl Record for Expense {
    type New = NewExpense;

    const TABLE: Table = Table::Expenses;

    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, column: Column) -> Option<Value<'_>> {
        match column {
            Column::Id => Some(Value::Text(&self.id)),
            Column::UserId => Some(Value::Text(&self.user_id)),
            Column::CategoryId => Some(Value::Text(&self.category_id)),
            Column::Amount => Some(Value::Amount(self.amount)),
            Column::Note => Some(Value::Text(&self.note)),
            Column::Date => Some(Value::Date(self.date)),
            _ => None,
        }
    }

    fn from_new(id: String, new: NewExpense) -> Result<Self> {
        require_positive(new.amount)?;
        Ok(Expense {
            id,
            user_id: new.user_id,
            category_id: new.category_id,
            amount: new.amount,
            note: new.note,
            date: new.date,
        })
    }

    fn rows(collections: &Collections) -> &Vec<Self> {
        &collections.expenses
    }

    fn rows_mut(collections: &mut Collections) -> &mut Vec<Self> {
        &mut collections.expenses
    }
}

impl Record for QuickExpense {
    type New = NewQuickExpense;

    const TABLE: Table = Table::QuickExpenses;

    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, column: Column) -> Option<Value<'_>> {
        match column {
            Column::Id => Some(Value::Text(&self.id)),
            Column::UserId => Some(Value::Text(&self.user_id)),
            Column::Name => Some(Value::Text(&self.name)),
            Column::Amount => Some(Value::Amount(self.amount)),
            Column::CategoryId => Some(Value::Text(&self.category_id)),
            _ => None,
        }
    }

    fn from_new(id: String, new: NewQuickExpense) -> Result<Self> {
        require_name(&new.name)?;
        require_positive(new.amount)?;
        Ok(QuickExpense {
            id,
            user_id: new.user_id,
            name: new.name,
            amount: new.amount,
            category_id: new.category_id,
        })
    }

    fn rows(collections: &Collections) -> &Vec<Self> {
        &collections.quick_expenses
    }

    fn rows_mut(collections: &mut Collections) -> &mut Vec<Self> {
        &mut collections.quick_expenses
    }
}

/// Equality predicate on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: Column,
    pub value: String,
}

impl Filter {
    pub fn eq(column: Column, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    /// A column the row does not have matches nothing
    pub fn matches<R: Record>(&self, row: &R) -> bool {
        row.value(self.column)
            .map(|v| v.matches(&self.value))
            .unwrap_or(false)
    }
}

/// Sort specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: Column,
    pub ascending: bool,
}

/// Select request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: Table,
    pub filter: Filter,
    pub order: Option<Order>,
}

impl Select {
    pub fn new(table: Table, filter: Filter) -> Self {
        Self {
            table,
            filter,
            order: None,
        }
    }

    pub fn order(mut self, column: Column, ascending: bool) -> Self {
        self.order = Some(Order { column, ascending });
        self
    }
}

/// Delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub table: Table,
    pub filter: Filter,
}

impl Delete {
    pub fn new(table: Table, filter: Filter) -> Self {
        Self { table, filter }
    }

    /// Delete the row with `id` from `table`
    pub fn by_id(table: Table, id: impl Into<String>) -> Self {
        Self::new(table, Filter::eq(Column::Id, id))
    }
}

/// Entry point of the request builder, returned by `Client::from`
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    table: Table,
}

impl QueryBuilder {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn select(self) -> SelectBuilder {
        SelectBuilder { table: self.table }
    }

    pub fn delete(self) -> DeleteBuilder {
        DeleteBuilder { table: self.table }
    }
}

/// A select awaiting its filter
#[derive(Debug, Clone, Copy)]
pub struct SelectBuilder {
    table: Table,
}

impl SelectBuilder {
    pub fn eq(self, column: Column, value: impl Into<String>) -> Select {
        Select::new(self.table, Filter::eq(column, value))
    }
}

/// A delete awaiting its filter
#[derive(Debug, Clone, Copy)]
pub struct DeleteBuilder {
    table: Table,
}

impl DeleteBuilder {
    pub fn eq(self, column: Column, value: impl Into<String>) -> Delete {
        Delete::new(self.table, Filter::eq(column, value))
    }
}

/// Insert payload for any table
#[derive(Debug, Clone, PartialEq)]
pub enum NewRow {
    Category(NewCategory),
    Expense(NewExpense),
    QuickExpense(NewQuickExpense),
}

impl NewRow {
    pub fn table(&self) -> Table {
        match self {
            NewRow::Category(_) => Table::Categories,
            NewRow::Expense(_) => Table::Expenses,
            NewRow::QuickExpense(_) => Table::QuickExpenses,
        }
    }
}

/// A stored row returned by insert
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Row {
    Category(Category),
    Expense(Expense),
    QuickExpense(QuickExpense),
}

impl Row {
    pub fn id(&self) -> &str {
        match self {
            Row::Category(c) => &c.id,
            Row::Expense(e) => &e.id,
            Row::QuickExpense(q) => &q.id,
        }
    }
}

/// Result of a select, one variant per table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rows {
    Categories(Vec<Category>),
    Expenses(Vec<Expense>),
    /// Quick-expenses always come enriched with their category
    QuickExpenses(Vec<QuickExpenseWithCategory>),
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Categories(rows) => rows.len(),
            Rows::Expenses(rows) => rows.len(),
            Rows::QuickExpenses(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows of `R` matching `filter`, sorted by `order`
///
/// The sort is stable. An order column the table lacks leaves the stored
/// order untouched.
pub fn filter_and_sort<R: Record>(rows: &[R], filter: &Filter, order: Option<&Order>) -> Vec<R> {
    let mut matched: Vec<R> = rows.iter().filter(|r| filter.matches(*r)).cloned().collect();

    if let Some(order) = order {
        if R::TABLE.has_column(order.column) {
            matched.sort_by(|a, b| {
                let ordering = match (a.value(order.column), b.value(order.column)) {
                    (Some(x), Some(y)) => x.compare(&y),
                    _ => Ordering::Equal,
                };
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
    }

    matched
}

fn enrich(quick_expenses: Vec<QuickExpense>, categories: &[Category]) -> Vec<QuickExpenseWithCategory> {
    quick_expenses
        .into_iter()
        .map(|quick_expense| {
            let category = categories
                .iter()
                .find(|c| c.id == quick_expense.category_id)
                .cloned();
            QuickExpenseWithCategory {
                quick_expense,
                categories: category,
            }
        })
        .collect()
}

/// Query execution against a [`DataStore`]
pub(crate) struct Engine<'a> {
    store: &'a DataStore,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(store: &'a DataStore) -> Self {
        Self { store }
    }

    pub(crate) async fn select(&self, query: &Select) -> Rows {
        debug!(
            "select from {} where {} = ? order {:?}",
            query.table, query.filter.column, query.order
        );
        let order = query.order.as_ref();
        match query.table {
            Table::Categories => Rows::Categories(self.select_as(&query.filter, order).await),
            Table::Expenses => Rows::Expenses(self.select_as(&query.filter, order).await),
            Table::QuickExpenses => {
                let filter = &query.filter;
                let enriched = self
                    .store
                    .read(|c| {
                        let rows = filter_and_sort(&c.quick_expenses, filter, order);
                        enrich(rows, &c.categories)
                    })
                    .await;
                Rows::QuickExpenses(enriched)
            }
        }
    }

    pub(crate) async fn select_as<R: Record>(&self, filter: &Filter, order: Option<&Order>) -> Vec<R> {
        self.store
            .read(|c| filter_and_sort(R::rows(c), filter, order))
            .await
    }

    pub(crate) async fn insert(&self, new: NewRow) -> Result<Row> {
        match new {
            NewRow::Category(new) => self.insert_as::<Category>(new).await.map(Row::Category),
            NewRow::Expense(new) => self.insert_as::<Expense>(new).await.map(Row::Expense),
            NewRow::QuickExpense(new) => self
                .insert_as::<QuickExpense>(new)
                .await
                .map(Row::QuickExpense),
        }
    }

    pub(crate) async fn insert_as<R: Record>(&self, new: R::New) -> Result<R> {
        let row = R::from_new(new_id(R::TABLE.id_prefix()), new)?;
        debug!("insert into {} id={}", R::TABLE, row.id());

        self.store
            .mutate(Operation::Insert(R::TABLE), move |c| {
                R::rows_mut(c).push(row.clone());
                Ok(row)
            })
            .await
    }

    pub(crate) async fn delete(&self, query: &Delete) -> Result<usize> {
        match query.table {
            Table::Categories => self.delete_as::<Category>(&query.filter).await,
            Table::Expenses => self.delete_as::<Expense>(&query.filter).await,
            Table::QuickExpenses => self.delete_as::<QuickExpense>(&query.filter).await,
        }
    }

    pub(crate) async fn delete_as<R: Record>(&self, filter: &Filter) -> Result<usize> {
        let removed = self
            .store
            .mutate(Operation::Delete(R::TABLE), |c| {
                let rows = R::rows_mut(c);
                let before = rows.len();
                rows.retain(|r| !filter.matches(r));
                Ok(before - rows.len())
            })
            .await?;

        debug!("delete from {} where {}: {} removed", R::TABLE, filter.column, removed);
        Ok(removed)
    }
}
