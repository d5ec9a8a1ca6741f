use std::io::{self, BufRead, Write};

use analytics_client::{AccountClient, ClientConfig, SessionStore};
use anyhow::{Context, Result};
use tracing::info;

fn account_client(config: &ClientConfig) -> AccountClient {
    AccountClient::new(&config.server, config.account_timeout())
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}: ")?;
    stdout.flush()?;
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        anyhow::bail!("stdin closed");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(
    config: &ClientConfig,
    sessions: &SessionStore,
    email: &str,
    password: &str,
) -> Result<()> {
    let session = account_client(config).verify_user(email, password).await?;
    sessions.save(&session)?;
    println!("Logged in as {}", session.username().unwrap_or(email));
    Ok(())
}

pub fn logout(sessions: &SessionStore) -> Result<()> {
    sessions.clear()?;
    info!("session cleared");
    println!("Logged out");
    Ok(())
}

pub async fn delete_account(config: &ClientConfig, sessions: &SessionStore, yes: bool) -> Result<()> {
    let session = sessions.load().unwrap_or_default();
    if session.email().is_some() && !yes {
        let answer = prompt(&format!(
            "Delete account {}? This cannot be undone [y/N]",
            session.email().unwrap_or_default()
        ))?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled");
            return Ok(());
        }
    }

    let message = account_client(config).delete_user(&session).await?;
    sessions.clear()?;
    println!("{message}");
    Ok(())
}

pub async fn forgot_password(config: &ClientConfig, email: &str) -> Result<()> {
    let client = account_client(config);
    let ticket = client.send_reset_email(email).await?;
    println!("{}", ticket.message);

    loop {
        let code = prompt("Verification code")?;
        match ticket.verify_code(&code) {
            Ok(()) => break,
            Err(e) => println!("{e}"),
        }
    }

    loop {
        let password = prompt("New password")?;
        let confirm = prompt("Confirm password")?;
        match client.update_password(&ticket.email, &password, &confirm).await {
            Ok(message) => {
                println!("{message}");
                return Ok(());
            }
            Err(e @ analytics_client::AccountError::Validation(_)) => println!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }
}
