//! Summary and report command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use tally_core::{category_breakdown, Config, ExpenseReport, Ledger, Summary};

use crate::output::Output;

/// Print today's and overall totals with the category breakdown
pub async fn summary(ledger: &Ledger, config: &Config, output: &Output) -> Result<()> {
    let data = ledger.load_current().await?;

    let summary = Summary::new(&data.expenses, Utc::now(), config.offset()?);
    let breakdown = category_breakdown(&data.expenses, &data.categories);

    output.print_summary(&summary, &breakdown);
    Ok(())
}

/// Render the text report to a file or stdout
pub async fn report(
    ledger: &Ledger,
    config: &Config,
    path: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let user = ledger.current_user().await?;
    let data = ledger.load(&user.id).await;

    let text = ExpenseReport::new(&user.full_name, &data.expenses, &data.categories)
        .currency(config.currency_symbol.as_str())
        .utc_offset(config.offset()?)
        .render();

    match path {
        Some(path) => {
            std::fs::write(&path, &text)
                .with_context(|| format!("Failed to write report: {:?}", path))?;
            output.success(&format!("Report written to {}", path.display()));
        }
        None => print!("{}", text),
    }
    Ok(())
}
