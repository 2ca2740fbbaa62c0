//! Command handlers
//!
//! Each submodule maps one group of subcommands onto the ledger.

pub mod auth;
pub mod category;
pub mod config;
pub mod expense;
pub mod quick;
pub mod report;

use anyhow::{bail, Result};

use tally_core::query::collation_key;
use tally_core::{Category, Expense, QuickExpenseWithCategory};

/// Something the user can refer to by id, id prefix or name
pub trait Named {
    const KIND: &'static str;
    fn id(&self) -> &str;
    fn label(&self) -> &str;
}

impl Named for Category {
    const KIND: &'static str = "category";
    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

impl Named for QuickExpenseWithCategory {
    const KIND: &'static str = "quick expense";
    fn id(&self) -> &str {
        &self.quick_expense.id
    }
    fn label(&self) -> &str {
        &self.quick_expense.name
    }
}

impl Named for Expense {
    const KIND: &'static str = "expense";
    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.note
    }
}

/// Find the item `query` refers to
///
/// Tries, in order: the full id, a case- and accent-insensitive name,
/// then an id prefix with or without the `cat-`/`exp-`/`qe-` part.
pub fn resolve<'a, T: Named>(items: &'a [T], query: &str) -> Result<&'a T> {
    let query = query.trim();
    if let Some(item) = items.iter().find(|i| i.id() == query) {
        return Ok(item);
    }

    let wanted = collation_key(query);
    let by_name: Vec<&T> = items
        .iter()
        .filter(|i| collation_key(i.label()) == wanted)
        .collect();
    if by_name.len() == 1 {
        return Ok(by_name[0]);
    }

    let by_prefix: Vec<&T> = items
        .iter()
        .filter(|i| {
            let id = i.id();
            let bare = id.split_once('-').map_or(id, |(_, rest)| rest);
            id.starts_with(query) || bare.starts_with(query)
        })
        .collect();

    let matches = if by_prefix.is_empty() { by_name } else { by_prefix };
    match matches.len() {
        0 => bail!("No {} found matching: {}", T::KIND, query),
        1 => Ok(matches[0]),
        _ => {
            eprintln!("Multiple {} entries match '{}':", T::KIND, query);
            for item in &matches {
                eprintln!("  {} - {}", item.id(), item.label());
            }
            bail!("Ambiguous {}. Please provide more characters of the ID.", T::KIND);
        }
    }
}
