//! Shell preferences and the notification queue.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Slice, next_local_id};

/// Colour theme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light palette.
    #[default]
    Light,
    /// Dark palette.
    Dark,
}

impl Theme {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl Display for Theme {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// Severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Operation succeeded.
    Success,
    /// Operation failed or input was rejected.
    Error,
    /// Neutral information.
    Info,
}

/// Transient message shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Locally unique identifier.
    pub id: u64,
    /// Severity.
    pub level: NotificationLevel,
    /// Message text.
    pub message: String,
}

/// UI slice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiState {
    /// Whether the navigation sidebar is expanded.
    pub sidebar_open: bool,
    /// Active theme.
    pub theme: Theme,
    /// Notifications in arrival order.
    pub notifications: Vec<Notification>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            theme: Theme::Light,
            notifications: Vec::new(),
        }
    }
}

/// Flip the sidebar.
pub const fn toggle_sidebar(state: &mut UiState) {
    state.sidebar_open = !state.sidebar_open;
}

/// Switch the theme.
pub const fn set_theme(state: &mut UiState, theme: Theme) {
    state.theme = theme;
}

/// Append a notification.
pub fn add_notification(state: &mut UiState, notification: Notification) {
    state.notifications.push(notification);
}

/// Remove a notification by id. Returns `false` when unknown.
pub fn remove_notification(state: &mut UiState, id: u64) -> bool {
    let before = state.notifications.len();
    state.notifications.retain(|notification| notification.id != id);
    state.notifications.len() != before
}

/// Observable handle over [`UiState`].
#[derive(Clone, Debug, Default)]
pub struct UiStore {
    slice: Slice<UiState>,
}

impl UiStore {
    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> UiState {
        self.slice.snapshot()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<UiState> {
        self.slice.subscribe()
    }

    /// See [`toggle_sidebar`].
    pub fn toggle_sidebar(&self) {
        self.slice.update(toggle_sidebar);
    }

    /// See [`set_theme`].
    pub fn set_theme(&self, theme: Theme) {
        self.slice.update(|state| set_theme(state, theme));
    }

    /// Queue a notification and return its id.
    pub fn add_notification(&self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        let notification = Notification {
            id: next_local_id(),
            level,
            message: message.into(),
        };
        let id = notification.id;
        self.slice
            .update(|state| add_notification(state, notification));
        id
    }

    /// Queue a success notification.
    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.add_notification(NotificationLevel::Success, message)
    }

    /// Queue an error notification.
    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.add_notification(NotificationLevel::Error, message)
    }

    /// Queue an informational notification.
    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.add_notification(NotificationLevel::Info, message)
    }

    /// See [`remove_notification`].
    pub fn remove_notification(&self, id: u64) -> bool {
        self.slice.update_if(|state| remove_notification(state, id))
    }

    /// Most recent notification.
    #[must_use]
    pub fn latest(&self) -> Option<Notification> {
        self.slice.read(|state| state.notifications.last().cloned())
    }
}
