//! Shared context, errors and session plumbing for command handlers.

use std::fmt::{self, Display, Formatter};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use datanex_client::{ApiClient, ApiError, ClientConfig, FileTokenStore, LoginRedirect, TokenStore};
use datanex_dashboard::store::NotificationLevel;
use datanex_dashboard::{ActionError, Confirm, Dashboard};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;
use tracing::warn;
use url::Url;

use crate::cli::OutputFormat;

pub(crate) const SESSION_EXPIRED: &str = "session expired; run `datanex login --token <TOKEN>`";

pub(crate) type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    AuthExpired,
}

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::AuthExpired => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::AuthExpired => SESSION_EXPIRED.to_string(),
        }
    }

    /// Failure from a direct client call, labelled with `fallback` unless the
    /// service sent a detail message.
    pub(crate) fn from_api(error: ApiError, fallback: &str) -> Self {
        if error.is_auth_expired() {
            return Self::AuthExpired;
        }
        let message = error.user_message(fallback);
        Self::Failure(anyhow::Error::new(error).context(message))
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

pub(crate) struct ContextSettings {
    pub(crate) api_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) token_file: PathBuf,
    pub(crate) output: OutputFormat,
    pub(crate) assume_yes: bool,
}

pub(crate) struct AppContext {
    pub(crate) dashboard: Dashboard,
    pub(crate) tokens: Arc<dyn TokenStore>,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    pub(crate) fn build(settings: &ContextSettings) -> CliResult<Self> {
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(settings.token_file.clone()));
        let config =
            ClientConfig::new(settings.api_url.as_str()).with_timeout(settings.timeout);
        let client = ApiClient::new(&config, tokens.clone(), Arc::new(LoginHint)).map_err(|err| {
            CliError::failure(anyhow::Error::new(err).context("failed to build API client"))
        })?;
        let assume_yes = settings.assume_yes;
        let confirm =
            move |prompt: &str| assume_yes || off_worker(|| ask_terminal(prompt));
        Ok(Self::new(client, tokens, Arc::new(confirm), settings.output))
    }

    pub(crate) fn new(
        client: ApiClient,
        tokens: Arc<dyn TokenStore>,
        confirm: Arc<dyn Confirm>,
        output: OutputFormat,
    ) -> Self {
        Self {
            dashboard: Dashboard::new(client, confirm),
            tokens,
            output,
        }
    }

    pub(crate) const fn client(&self) -> &ApiClient {
        self.dashboard.client()
    }

    /// Convert an action failure, reusing the error notification the action
    /// raised so the CLI and the console report the same text.
    pub(crate) fn action_error(&self, error: ActionError) -> CliError {
        let notice = self
            .dashboard
            .ui()
            .latest()
            .filter(|notification| notification.level == NotificationLevel::Error)
            .map(|notification| notification.message);
        match error {
            ActionError::Validation(inner) => CliError::validation(inner.to_string()),
            ActionError::Declined => CliError::validation("aborted: confirmation declined"),
            ActionError::Api { source } if source.is_auth_expired() => CliError::AuthExpired,
            ActionError::Api { source } => {
                let mut message = notice.unwrap_or_else(|| source.to_string());
                if let Some(detail) = source.detail().filter(|detail| !message.contains(detail)) {
                    message = format!("{message} ({detail})");
                }
                CliError::Failure(anyhow::Error::new(source).context(message))
            }
        }
    }

    /// Echo the last success or info notification on stderr.
    pub(crate) fn print_notice(&self) {
        if self.output != OutputFormat::Table {
            return;
        }
        if let Some(notification) = self
            .dashboard
            .ui()
            .latest()
            .filter(|notification| notification.level != NotificationLevel::Error)
        {
            eprintln!("{}", notification.message);
        }
    }
}

struct LoginHint;

impl LoginRedirect for LoginHint {
    fn redirect_to_login(&self) {
        warn!("stored token rejected by the service; token cleared");
    }
}

/// Run a blocking call without stalling the other tasks on a multi-thread
/// runtime. Elsewhere the call runs inline.
fn off_worker<T>(call: impl FnOnce() -> T) -> T {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => block_in_place(call),
        _ => call(),
    }
}

fn ask_terminal(prompt: &str) -> bool {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return false;
    }
    eprint!("{prompt} [y/N] ");
    if io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if stdin.lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn read_error(path: &Path, err: &io::Error) -> CliError {
    CliError::failure(anyhow!("failed to read {}: {err}", path.display()))
}

#[cfg(test)]
pub(crate) fn test_context(
    server: &httpmock::MockServer,
    tokens: Arc<dyn TokenStore>,
    answer: bool,
) -> AppContext {
    let client = ApiClient::new(
        &ClientConfig::new(server.base_url()),
        tokens.clone(),
        Arc::new(LoginHint),
    )
    .unwrap_or_else(|err| panic!("client should build: {err}"));
    AppContext::new(
        client,
        tokens,
        Arc::new(move |_: &str| answer),
        OutputFormat::Table,
    )
}
