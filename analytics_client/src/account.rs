//! Account endpoints: login, account deletion and the password reset flow.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::AccountError;
use crate::session::SessionContext;

const VERIFY_USER_PATH: &str = "/api/verify/user";
const DELETE_USER_PATH: &str = "/api/delete/user";
const RESET_EMAIL_PATH: &str = "/api/send/auth/reset/password/email";
const UPDATE_PASSWORD_PATH: &str = "/api/update/password";

const MIN_PASSWORD_LEN: usize = 6;
const CODE_LEN: usize = 6;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct EmailOnly<'a> {
    email: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct UserData {
    #[serde(default)]
    username: Option<String>,
}

/// Union of the reply bodies; every endpoint fills a different subset.
#[derive(Debug, Default, Deserialize)]
struct Reply {
    #[serde(default)]
    verify: bool,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    data: Option<UserData>,
}

impl Reply {
    fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    fn username(&self) -> Option<String> {
        self.data.as_ref().and_then(|d| d.username.clone())
    }
}

/// What the server handed back after sending a reset email.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetTicket {
    pub email: String,
    pub username: Option<String>,
    pub message: String,
    code: String,
}

impl ResetTicket {
    pub fn new(email: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: None,
            message: String::new(),
            code: code.into(),
        }
    }

    /// Checks a user-entered code against the one the server sent. No request is made.
    pub fn verify_code(&self, entered: &str) -> Result<(), AccountError> {
        let entered = entered.trim();
        if entered.len() != CODE_LEN || !entered.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccountError::Validation("Please enter all 6 digits.".into()));
        }
        if entered != self.code {
            return Err(AccountError::Validation(
                "Invalid verification code. Please try again.".into(),
            ));
        }
        Ok(())
    }
}

pub struct AccountClient {
    client: reqwest::Client,
    server: String,
}

impl AccountClient {
    pub fn new(server: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            server: server.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(StatusCode, Reply), AccountError> {
        let url = format!("{}{}", self.server, path);
        debug!("POST {url}");
        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            warn!("request to {url} failed: {e}");
            AccountError::Network
        })?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let reply = serde_json::from_str(&text).unwrap_or_else(|e| {
            if !text.trim().is_empty() {
                warn!("unreadable reply from {url}: {e}");
            }
            Reply::default()
        });
        Ok((status, reply))
    }

    /// Logs in. On success returns the session to persist.
    pub async fn verify_user(&self, email: &str, password: &str) -> Result<SessionContext, AccountError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::Validation("All fields are required".into()));
        }

        let (status, reply) = self.post(VERIFY_USER_PATH, &Credentials { email, password }).await?;
        if !status.is_success() {
            return Err(AccountError::Rejected(reply.message_or("Login failed")));
        }
        if !reply.verify {
            return Err(AccountError::Rejected(reply.message_or("Login failed")));
        }

        let username = reply.username().unwrap_or_else(|| email.to_string());
        info!("logged in as {username}");
        Ok(SessionContext::logged_in(username, email))
    }

    /// Deletes the logged-in account. The caller clears the session on `Ok`.
    pub async fn delete_user(&self, session: &SessionContext) -> Result<String, AccountError> {
        let email = session.email().ok_or(AccountError::NotLoggedIn)?;

        let (status, reply) = self.post(DELETE_USER_PATH, &EmailOnly { email }).await?;
        match status {
            s if s.is_success() => {
                if reply.success {
                    Ok(reply.message_or("User deleted successfully"))
                } else {
                    Err(AccountError::Rejected(reply.message_or("Unknown server response")))
                }
            }
            StatusCode::NOT_FOUND => Err(AccountError::Rejected("User not found".into())),
            StatusCode::BAD_REQUEST => Err(AccountError::Rejected("Invalid email format".into())),
            StatusCode::INTERNAL_SERVER_ERROR => {
                Err(AccountError::Rejected("Internal server error".into()))
            }
            _ => Err(AccountError::Rejected(
                reply
                    .detail
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| "Unexpected error".into()),
            )),
        }
    }

    /// Asks the server to email a reset code.
    pub async fn send_reset_email(&self, email: &str) -> Result<ResetTicket, AccountError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AccountError::Validation("Email field is required".into()));
        }

        let (status, reply) = self.post(RESET_EMAIL_PATH, &EmailOnly { email }).await?;
        if !status.is_success() {
            return Err(AccountError::Rejected(
                reply.message_or("Failed to send reset email. Please try again."),
            ));
        }
        if !reply.success {
            return Err(AccountError::Rejected(
                reply.message_or("Something went wrong. Please try again."),
            ));
        }

        let code = match &reply.code {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => format!("{:0>6}", n.to_string()),
            _ => {
                return Err(AccountError::Rejected(
                    "Something went wrong. Please try again.".into(),
                ))
            }
        };

        Ok(ResetTicket {
            email: email.to_string(),
            username: reply.username(),
            message: reply.message_or("Reset code sent"),
            code,
        })
    }

    pub async fn update_password(
        &self,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<String, AccountError> {
        validate_new_password(password, confirm)?;

        let (status, reply) = self
            .post(UPDATE_PASSWORD_PATH, &Credentials { email: email.trim(), password })
            .await?;
        if !status.is_success() {
            let message = reply
                .detail
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| reply.message_or("Something went wrong. Try again."));
            return Err(AccountError::Rejected(message));
        }
        Ok(reply.message_or("Password updated successfully."))
    }
}

pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), AccountError> {
    if password.is_empty() || confirm.is_empty() {
        return Err(AccountError::Validation("All fields are required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }
    if password != confirm {
        return Err(AccountError::Validation("Passwords do not match".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_verification() {
        let ticket = ResetTicket::new("ada@example.com", "042917");
        assert!(ticket.verify_code("042917").is_ok());
        assert!(ticket.verify_code(" 042917 ").is_ok());
        assert_eq!(
            ticket.verify_code("4291").unwrap_err().to_string(),
            "Please enter all 6 digits."
        );
        assert_eq!(
            ticket.verify_code("04291a").unwrap_err().to_string(),
            "Please enter all 6 digits."
        );
        assert_eq!(
            ticket.verify_code("123456").unwrap_err().to_string(),
            "Invalid verification code. Please try again."
        );
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(
            validate_new_password("", "").unwrap_err().to_string(),
            "All fields are required"
        );
        assert_eq!(
            validate_new_password("abc", "abc").unwrap_err().to_string(),
            "Password must be at least 6 characters long"
        );
        assert_eq!(
            validate_new_password("abcdef", "abcdeg").unwrap_err().to_string(),
            "Passwords do not match"
        );
        assert!(validate_new_password("abcdef", "abcdef").is_ok());
    }

    #[test]
    fn test_reply_tolerates_missing_fields() {
        let reply: Reply = serde_json::from_str(r#"{"success":true,"code":123456}"#).unwrap();
        assert!(reply.success);
        assert_eq!(reply.message_or("fallback"), "fallback");
        assert!(reply.username().is_none());
    }
}
