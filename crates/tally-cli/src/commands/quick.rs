//! Quick expense command handlers

use anyhow::Result;
use rust_decimal::Decimal;

use tally_core::Ledger;

use super::resolve;
use crate::output::Output;

pub async fn list(ledger: &Ledger, output: &Output) -> Result<()> {
    let data = ledger.load_current().await?;
    output.print_quick_expenses(&data.quick_expenses);
    Ok(())
}

/// Add a template for a recurring expense
pub async fn add(
    ledger: &Ledger,
    name: String,
    amount: Decimal,
    category: String,
    output: &Output,
) -> Result<()> {
    let data = ledger.load_current().await?;
    let category = resolve(&data.categories, &category)?;

    let template = ledger
        .add_quick_template(&name, amount, &category.id)
        .await?;

    if output.is_quiet() {
        println!("{}", template.id);
    } else {
        output.success(&format!(
            "Quick expense added: {} {} ({})",
            template.name,
            output.money(template.amount),
            template.id
        ));
    }
    Ok(())
}

/// Record an expense from a template in one step
pub async fn use_template(ledger: &Ledger, id: String, output: &Output) -> Result<()> {
    let data = ledger.load_current().await?;
    let template = resolve(&data.quick_expenses, &id)?;

    let expense = ledger
        .add_quick_expense(&template.quick_expense.id)
        .await?;

    if output.is_quiet() {
        println!("{}", expense.id);
    } else if output.is_json() {
        output.print_expense(&expense, &data.categories);
    } else {
        output.success(&format!(
            "Added {} for {}",
            output.money(expense.amount),
            expense.note
        ));
    }
    Ok(())
}

pub async fn delete(ledger: &Ledger, id: String, output: &Output) -> Result<()> {
    let data = ledger.load_current().await?;
    let template = resolve(&data.quick_expenses, &id)?;

    ledger
        .delete_quick_template(&template.quick_expense.id)
        .await?;
    output.success(&format!(
        "Quick expense deleted: {}",
        template.quick_expense.name
    ));
    Ok(())
}
