//! Expense command handlers

use anyhow::{bail, Result};
use rust_decimal::Decimal;

use tally_core::Ledger;

use super::resolve;
use crate::output::Output;
use crate::prompt;

/// List expenses, newest first
pub async fn list(ledger: &Ledger, output: &Output) -> Result<()> {
    let data = ledger.load_current().await?;
    output.print_expenses(&data.expenses, &data.categories);
    Ok(())
}

/// Record an expense dated now
pub async fn add(
    ledger: &Ledger,
    amount: Decimal,
    note: Option<String>,
    category: Option<String>,
    output: &Output,
) -> Result<()> {
    let data = ledger.load_current().await?;
    let category = match category {
        Some(query) => resolve(&data.categories, &query)?,
        None => match data.categories.first() {
            Some(first) => first,
            None => bail!("No categories yet. Add one with `tally category add <name>`."),
        },
    };

    let expense = ledger
        .add_expense(amount, &category.id, note.as_deref())
        .await?;

    if output.is_quiet() {
        println!("{}", expense.id);
    } else if output.is_json() {
        output.print_expense(&expense, &data.categories);
    } else {
        output.success(&format!(
            "Expense added: {} for {} ({})",
            output.money(expense.amount),
            category.name,
            expense.note
        ));
    }
    Ok(())
}

pub async fn delete(
    ledger: &Ledger,
    id: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let data = ledger.load_current().await?;
    let expense = resolve(&data.expenses, &id)?;

    if !yes && output.should_prompt() {
        output.print_expense(expense, &data.categories);
        if !prompt::confirm("Delete this expense?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    ledger.delete_expense(&expense.id).await?;
    output.success(&format!("Expense deleted: {}", expense.id));
    Ok(())
}
