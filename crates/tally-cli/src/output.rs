//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag), wrapped in the `{data, error}` envelope
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tally_core::report::DEFAULT_CURRENCY;
use tally_core::{
    to_fixed, ApiResponse, AuthData, Category, CategoryTotal, Error, Expense,
    QuickExpenseWithCategory, Summary, UserPublic,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
    currency: String,
    offset: FixedOffset,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            currency: DEFAULT_CURRENCY.to_string(),
            offset: Utc.fix(),
        }
    }

    /// Use a currency symbol and UTC offset for amounts and dates
    pub fn with_locale(mut self, currency: impl Into<String>, offset: FixedOffset) -> Self {
        self.currency = currency.into();
        self.offset = offset;
        self
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn money(&self, amount: Decimal) -> String {
        format!("{}{}", self.currency, to_fixed(amount, 2))
    }

    fn local_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%Y-%m-%d %H:%M").to_string()
    }

    /// Print `data` as a successful JSON envelope
    fn print_json<T: Serialize>(&self, data: T) {
        match serde_json::to_string_pretty(&ApiResponse::ok(data)) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: could not encode output: {}", e),
        }
    }

    /// Print the result of sign-up or sign-in
    pub fn print_auth(&self, data: &AuthData) {
        match self.format {
            OutputFormat::Human => {
                println!("Signed in as {} <{}>", display_name(&data.user), data.user.email);
            }
            OutputFormat::Json => self.print_json(data),
            OutputFormat::Quiet => println!("{}", data.user.id),
        }
    }

    /// Print a user profile
    pub fn print_user(&self, user: &UserPublic) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", user.id);
                println!("Name:    {}", display_name(user));
                println!("Email:   {}", user.email);
                println!("Joined:  {}", self.local_time(user.created_at));
            }
            OutputFormat::Json => self.print_json(user),
            OutputFormat::Quiet => println!("{}", user.id),
        }
    }

    /// Print a list of categories
    pub fn print_categories(&self, categories: &[Category]) {
        match self.format {
            OutputFormat::Human => {
                if categories.is_empty() {
                    println!("No categories found.");
                    return;
                }
                for category in categories {
                    println!(
                        "{} | {:<12} | {} | {}",
                        short_id(&category.id),
                        truncate(&category.icon, 12),
                        category.color,
                        category.name
                    );
                }
                println!("\n{} category(ies)", categories.len());
            }
            OutputFormat::Json => self.print_json(categories),
            OutputFormat::Quiet => {
                for category in categories {
                    println!("{}", category.id);
                }
            }
        }
    }

    /// Print a single expense
    pub fn print_expense(&self, expense: &Expense, categories: &[Category]) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", expense.id);
                println!("Amount:   {}", self.money(expense.amount));
                println!("Category: {}", category_name(categories, &expense.category_id));
                println!("Note:     {}", expense.note);
                println!("Date:     {}", self.local_time(expense.date));
            }
            OutputFormat::Json => self.print_json(expense),
            OutputFormat::Quiet => println!("{}", expense.id),
        }
    }

    /// Print a list of expenses
    pub fn print_expenses(&self, expenses: &[Expense], categories: &[Category]) {
        match self.format {
            OutputFormat::Human => {
                if expenses.is_empty() {
                    println!("No expenses found.");
                    return;
                }
                for expense in expenses {
                    println!(
                        "{} | {} | {:>10} | {:<14} | {}",
                        short_id(&expense.id),
                        self.local_time(expense.date),
                        self.money(expense.amount),
                        truncate(category_name(categories, &expense.category_id), 14),
                        truncate(&expense.note, 40)
                    );
                }
                println!("\n{} expense(s)", expenses.len());
            }
            OutputFormat::Json => self.print_json(expenses),
            OutputFormat::Quiet => {
                for expense in expenses {
                    println!("{}", expense.id);
                }
            }
        }
    }

    /// Print quick-expense templates with their categories
    pub fn print_quick_expenses(&self, quick_expenses: &[QuickExpenseWithCategory]) {
        match self.format {
            OutputFormat::Human => {
                if quick_expenses.is_empty() {
                    println!("No quick expenses found.");
                    return;
                }
                for q in quick_expenses {
                    let category = q
                        .categories
                        .as_ref()
                        .map_or("Unknown", |c| c.name.as_str());
                    println!(
                        "{} | {:<16} | {:>10} | {}",
                        short_id(&q.quick_expense.id),
                        truncate(&q.quick_expense.name, 16),
                        self.money(q.quick_expense.amount),
                        category
                    );
                }
                println!("\n{} quick expense(s)", quick_expenses.len());
            }
            OutputFormat::Json => self.print_json(quick_expenses),
            OutputFormat::Quiet => {
                for q in quick_expenses {
                    println!("{}", q.quick_expense.id);
                }
            }
        }
    }

    /// Print totals and the category breakdown
    pub fn print_summary(&self, summary: &Summary, breakdown: &[CategoryTotal]) {
        match self.format {
            OutputFormat::Human => {
                println!("Today:    {} ({} expense(s))", self.money(summary.today_total), summary.today_count);
                println!("Total:    {} ({} expense(s))", self.money(summary.total), summary.count);
                if let Some(average) = summary.average {
                    println!("Average:  {}", self.money(average));
                }
                if let Some(highest) = &summary.highest {
                    println!("Highest:  {} ({})", self.money(highest.amount), highest.note);
                }
                if !breakdown.is_empty() {
                    println!();
                    println!("By category:");
                    for entry in breakdown {
                        println!(
                            "  {:<16} {:>10} {:>6}%",
                            truncate(&entry.name, 16),
                            self.money(entry.amount),
                            to_fixed(entry.percentage, 1)
                        );
                    }
                }
            }
            OutputFormat::Json => self.print_json(serde_json::json!({
                "summary": summary,
                "categories": breakdown,
            })),
            OutputFormat::Quiet => println!("{}", to_fixed(summary.total, 2)),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => self.print_json(status_body("success", message)),
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => self.print_json(status_body("info", msg)),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a backend error without internal detail
    pub fn error(&self, error: &Error) {
        match self.format {
            OutputFormat::Json => {
                let response = ApiResponse::<()>::fail(error);
                match serde_json::to_string_pretty(&response) {
                    Ok(json) => println!("{}", json),
                    Err(_) => eprintln!("Error: {}", error.public_message()),
                }
            }
            _ => {
                eprintln!("Error: {}", error.public_message());
                if matches!(error, Error::NoActiveSession) && !self.is_quiet() {
                    eprintln!("Run `tally login` or `tally signup` first.");
                }
            }
        }
    }
}

/// Payload of a JSON status line
fn status_body(status: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"status": status, "message": message})
}

fn display_name(user: &UserPublic) -> &str {
    if user.full_name.is_empty() {
        "User"
    } else {
        &user.full_name
    }
}

fn category_name<'a>(categories: &'a [Category], id: &str) -> &'a str {
    categories
        .iter()
        .find(|c| c.id == id)
        .map_or("Unknown", |c| c.name.as_str())
}

/// Shorten `exp-5f0c1a2b...` to `exp-5f0c1a2b`
pub fn short_id(id: &str) -> String {
    match id.split_once('-') {
        Some((prefix, rest)) => format!("{}-{}", prefix, rest.chars().take(8).collect::<String>()),
        None => id.chars().take(8).collect(),
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("Café au lait au comptoir", 8), "Café ...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("exp-5f0c1a2b3c4d5e6f"), "exp-5f0c1a2b");
        assert_eq!(short_id("qe-12"), "qe-12");
        assert_eq!(short_id("abcdefghijk"), "abcdefgh");
    }

    #[test]
    fn test_status_lines_use_the_envelope() {
        let envelope = serde_json::to_value(ApiResponse::ok(status_body("success", "Signed out")))
            .unwrap();
        assert_eq!(envelope["data"]["status"], "success");
        assert_eq!(envelope["data"]["message"], "Signed out");
        assert!(envelope["error"].is_null());
    }

    #[test]
    fn test_money_rounds_instead_of_truncating() {
        let output = Output::new(OutputFormat::Human);
        assert_eq!(output.money(Decimal::new(1235, 3)), "₹1.24");
        assert_eq!(output.money(Decimal::new(19999, 4)), "₹2.00");
    }

    #[test]
    fn test_money_uses_locale() {
        let output = Output::new(OutputFormat::Human);
        assert_eq!(output.money(Decimal::new(125, 1)), "₹12.50");

        let output = output.with_locale("$", FixedOffset::east_opt(3600).unwrap());
        assert_eq!(output.money(Decimal::new(5, 0)), "$5.00");
    }
}
