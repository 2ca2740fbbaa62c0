//! Category command handlers

use anyhow::Result;

use tally_core::Ledger;

use super::resolve;
use crate::output::Output;
use crate::prompt;

pub async fn list(ledger: &Ledger, output: &Output) -> Result<()> {
    let data = ledger.load_current().await?;
    output.print_categories(&data.categories);
    Ok(())
}

pub async fn add(
    ledger: &Ledger,
    name: String,
    icon: String,
    color: String,
    output: &Output,
) -> Result<()> {
    let category = ledger.add_category(&name, &icon, &color).await?;

    if output.is_quiet() {
        println!("{}", category.id);
    } else {
        output.success(&format!("Category added: {} ({})", category.name, category.id));
    }
    Ok(())
}

/// Delete a category; refused while expenses still use it
pub async fn delete(ledger: &Ledger, id: String, yes: bool, output: &Output) -> Result<()> {
    let data = ledger.load_current().await?;
    let category = resolve(&data.categories, &id)?;

    if !yes && output.should_prompt() {
        let question = format!("Delete category '{}'?", category.name);
        if !prompt::confirm(&question)? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    ledger.delete_category(&category.id).await?;
    output.success(&format!("Category deleted: {}", category.name));
    Ok(())
}
