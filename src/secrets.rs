//! Secret resolution for API credentials.
//!
//! A secret is either absent, a literal value, or a shell command that
//! prints the value (e.g. `pass show spotify/secret`). Commands are run on
//! every resolution so rotating tokens are picked up.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Timeout for secret command execution.
const SECRET_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Failed to execute secret command: {0}")]
    Execution(String),

    #[error("Secret command timed out")]
    Timeout,

    #[error("Secret command failed with status {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Secret command returned an empty value")]
    Empty,
}

/// Source of a secret value.
#[derive(Clone, Default)]
pub enum SecretSource {
    /// No secret configured.
    #[default]
    None,
    /// Static value.
    Static(String),
    /// Shell command that outputs the secret.
    Command(String),
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::None => write!(f, "None"),
            SecretSource::Static(_) => write!(f, "Static(<redacted>)"),
            SecretSource::Command(cmd) => write!(f, "Command({:?})", cmd),
        }
    }
}

impl SecretSource {
    /// Build a source from an optional literal and an optional command.
    /// A non-empty literal wins over the command.
    pub fn from_parts(value: Option<String>, command: Option<String>) -> Self {
        match (value.filter(|v| !v.trim().is_empty()), command) {
            (Some(value), _) => SecretSource::Static(value),
            (None, Some(cmd)) if !cmd.trim().is_empty() => SecretSource::Command(cmd),
            _ => SecretSource::None,
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, SecretSource::None)
    }

    /// Get the current secret, executing the command if necessary.
    pub async fn resolve(&self) -> Result<Option<String>, SecretError> {
        match self {
            SecretSource::None => Ok(None),
            SecretSource::Static(value) => Ok(Some(value.clone())),
            SecretSource::Command(cmd) => {
                debug!(command = %cmd, "Fetching secret via command");

                let result = tokio::time::timeout(
                    SECRET_COMMAND_TIMEOUT,
                    Command::new("sh").arg("-c").arg(cmd).output(),
                )
                .await;

                let output = match result {
                    Ok(Ok(output)) => output,
                    Ok(Err(e)) => {
                        warn!(command = %cmd, error = %e, "Secret command failed to execute");
                        return Err(SecretError::Execution(e.to_string()));
                    }
                    Err(_) => {
                        warn!(command = %cmd, "Secret command timed out");
                        return Err(SecretError::Timeout);
                    }
                };

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                    warn!(command = %cmd, stderr = %stderr, "Secret command failed");
                    return Err(SecretError::Failed {
                        status: output.status.to_string(),
                        stderr,
                    });
                }

                let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if value.is_empty() {
                    warn!(command = %cmd, "Secret command returned empty value");
                    return Err(SecretError::Empty);
                }

                Ok(Some(value))
            }
        }
    }
}
