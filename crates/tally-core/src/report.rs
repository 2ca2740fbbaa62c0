//! Spending summaries and the shareable text report

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::{Category, Expense};

/// Currency symbol used when none is configured
pub const DEFAULT_CURRENCY: &str = "₹";

const RULE: &str = "===================================";
const THIN_RULE: &str = "-----------------------------------";

/// Spending in one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category_id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub amount: Decimal,
    /// Share of all spending, 0 to 100
    pub percentage: Decimal,
}

/// `value` rounded half away from zero to `places` decimals and padded,
/// so 66.66.. shows as "66.7" and 1.235 as "1.24"
pub fn to_fixed(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", places as usize, rounded)
}

/// Per-category totals, largest first
///
/// Expenses whose category no longer exists are grouped under "Unknown".
pub fn category_breakdown(expenses: &[Expense], categories: &[Category]) -> Vec<CategoryTotal> {
    let mut totals: Vec<(String, Decimal)> = Vec::new();
    for expense in expenses {
        match totals.iter_mut().find(|(id, _)| *id == expense.category_id) {
            Some((_, amount)) => *amount += expense.amount,
            None => totals.push((expense.category_id.clone(), expense.amount)),
        }
    }
    let total: Decimal = totals.iter().map(|(_, amount)| *amount).sum();

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category_id, amount)| {
            let category = categories.iter().find(|c| c.id == category_id);
            let percentage = if total > Decimal::ZERO {
                amount / total * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };
            CategoryTotal {
                name: category.map_or("Unknown", |c| c.name.as_str()).to_string(),
                color: category.map_or("#999", |c| c.color.as_str()).to_string(),
                icon: category.map_or("help-circle", |c| c.icon.as_str()).to_string(),
                category_id,
                amount,
                percentage,
            }
        })
        .collect();

    breakdown.sort_by(|a, b| b.amount.cmp(&a.amount));
    breakdown
}

/// Headline numbers over a set of expenses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: Decimal,
    pub count: usize,
    pub today_total: Decimal,
    pub today_count: usize,
    pub average: Option<Decimal>,
    pub highest: Option<Expense>,
}

impl Summary {
    /// Summarize `expenses`, counting as "today" those on the same calendar
    /// day as `now` at `offset`
    pub fn new(expenses: &[Expense], now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let today = local_day(now, offset);
        let total: Decimal = expenses.iter().map(|e| e.amount).sum();
        let todays: Vec<&Expense> = expenses
            .iter()
            .filter(|e| local_day(e.date, offset) == today)
            .collect();

        let highest = expenses
            .iter()
            .fold(None::<&Expense>, |max, e| match max {
                Some(m) if m.amount >= e.amount => Some(m),
                _ => Some(e),
            })
            .cloned();

        Self {
            total,
            count: expenses.len(),
            today_total: todays.iter().map(|e| e.amount).sum(),
            today_count: todays.len(),
            average: (!expenses.is_empty()).then(|| total / Decimal::from(expenses.len())),
            highest,
        }
    }
}

fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Plain-text expense report
pub struct ExpenseReport<'a> {
    user_name: &'a str,
    expenses: &'a [Expense],
    categories: &'a [Category],
    currency: String,
    offset: FixedOffset,
    generated_at: DateTime<Utc>,
}

impl<'a> ExpenseReport<'a> {
    /// `expenses` are expected newest first
    pub fn new(user_name: &'a str, expenses: &'a [Expense], categories: &'a [Category]) -> Self {
        Self {
            user_name,
            expenses,
            categories,
            currency: DEFAULT_CURRENCY.to_string(),
            offset: Utc.fix(),
            generated_at: Utc::now(),
        }
    }

    pub fn currency(mut self, symbol: impl Into<String>) -> Self {
        self.currency = symbol.into();
        self
    }

    /// Offset from UTC used to decide calendar days
    pub fn utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    fn money(&self, amount: Decimal) -> String {
        format!("{}{}", self.currency, to_fixed(amount, 2))
    }

    fn category_name(&self, id: &str) -> &str {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map_or("Unknown", |c| c.name.as_str())
    }

    fn line(&self, expense: &Expense) -> String {
        format!(
            "• {} ({}): {}\n",
            expense.note,
            self.category_name(&expense.category_id),
            self.money(expense.amount)
        )
    }

    pub fn render(&self) -> String {
        let generated = self.generated_at.with_timezone(&self.offset);
        let today = generated.date_naive();
        let user = if self.user_name.trim().is_empty() {
            "User"
        } else {
            self.user_name
        };

        let mut out = String::new();
        out.push_str("EXPENSE REPORT\n");
        out.push_str(RULE);
        out.push_str("\n\n");
        out.push_str(&format!("Generated on: {}\n", generated.format("%B %-d, %Y")));
        out.push_str(&format!("User: {}\n\n", user));

        let (todays, previous): (Vec<&Expense>, Vec<&Expense>) = self
            .expenses
            .iter()
            .partition(|e| local_day(e.date, self.offset) == today);

        out.push_str("TODAY'S EXPENSES\n");
        out.push_str(RULE);
        out.push('\n');
        let today_total: Decimal = todays.iter().map(|e| e.amount).sum();
        out.push_str(&format!("Total: {}\n\n", self.money(today_total)));
        if todays.is_empty() {
            out.push_str("No expenses recorded today.\n");
        } else {
            for expense in &todays {
                out.push_str(&self.line(expense));
            }
        }
        out.push('\n');

        out.push_str("PREVIOUS EXPENSES\n");
        out.push_str(RULE);
        out.push('\n');
        if previous.is_empty() {
            out.push_str("No previous expenses recorded.\n");
        } else {
            let mut days: Vec<(NaiveDate, Vec<&Expense>)> = Vec::new();
            for expense in previous {
                let day = local_day(expense.date, self.offset);
                match days.iter_mut().find(|(d, _)| *d == day) {
                    Some((_, group)) => group.push(expense),
                    None => days.push((day, vec![expense])),
                }
            }
            days.sort_by(|a, b| b.0.cmp(&a.0));

            for (day, group) in days {
                let day_total: Decimal = group.iter().map(|e| e.amount).sum();
                out.push_str(&format!(
                    "\n{} - Total: {}\n",
                    day.format("%b %-d, %Y"),
                    self.money(day_total)
                ));
                out.push_str(THIN_RULE);
                out.push('\n');
                for expense in group {
                    out.push_str(&self.line(expense));
                }
            }
        }

        out.push_str("\nCATEGORY BREAKDOWN\n");
        out.push_str(RULE);
        out.push('\n');
        for entry in category_breakdown(self.expenses, self.categories) {
            out.push_str(&format!(
                "• {}: {} ({}%)\n",
                entry.name,
                self.money(entry.amount),
                to_fixed(entry.percentage, 1)
            ));
        }

        let summary = Summary::new(self.expenses, self.generated_at, self.offset);
        out.push_str("\nSUMMARY\n");
        out.push_str(RULE);
        out.push('\n');
        out.push_str(&format!("Total Expenses: {}\n", self.money(summary.total)));
        out.push_str(&format!("Number of Transactions: {}\n", summary.count));
        if let Some(average) = summary.average {
            out.push_str(&format!("Average Expense: {}\n", self.money(average)));
        }
        if let Some(highest) = &summary.highest {
            out.push_str(&format!(
                "Highest Expense: {} ({})\n",
                self.money(highest.amount),
                highest.note
            ));
        }

        out.push('\n');
        out.push_str(THIN_RULE);
        out.push_str("\nGenerated by Daily Expense Tracker\n");
        out
    }
}
