//! Account command handlers

use anyhow::Result;

use tally_core::{Ledger, SignUpForm, UserUpdate};

use crate::output::Output;
use crate::prompt;

/// Create an account and sign in
pub async fn sign_up(
    ledger: &Ledger,
    email: String,
    name: String,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt::read_new_password("Password")?,
    };

    let form = SignUpForm {
        email,
        confirm_password: password.clone(),
        password,
        full_name: name,
    };
    let data = ledger.sign_up(&form).await?;

    output.print_auth(&data);
    Ok(())
}

/// Sign in with email and password
pub async fn login(
    ledger: &Ledger,
    email: String,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt::read_password("Password")?,
    };

    let data = ledger.sign_in(&email, &password).await?;
    output.print_auth(&data);
    Ok(())
}

pub async fn logout(ledger: &Ledger, output: &Output) -> Result<()> {
    ledger.sign_out().await?;
    output.success("Signed out");
    Ok(())
}

pub async fn whoami(ledger: &Ledger, output: &Output) -> Result<()> {
    let user = ledger.current_user().await?;
    output.print_user(&user);
    Ok(())
}

/// Show the profile, or update it when a field is given
pub async fn profile(
    ledger: &Ledger,
    name: Option<String>,
    email: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut update = UserUpdate::new();
    if let Some(name) = name {
        update = update.full_name(name.trim());
    }
    if let Some(email) = email {
        update = update.email(email.trim());
    }

    if update.is_empty() {
        return whoami(ledger, output).await;
    }

    let user = ledger.client().auth().update_user(update).await?;
    output.print_user(&user);
    Ok(())
}
