//! Local preferences. Nothing here is sent to the service.

use std::fmt::{self, Debug, Formatter};

use serde::{Deserialize, Serialize};

use super::Slice;
use super::ui::Theme;

/// Default upload size limit in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 500;
/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// User preferences. The `Debug` output masks the stored API keys.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Settings {
    /// Interface language code.
    pub language: String,
    /// Colour theme.
    pub theme: Theme,
    /// IANA timezone name.
    pub timezone: String,
    /// Master switch for email notifications.
    pub email_notifications: bool,
    /// Notify when an analysis completes.
    pub analysis_complete: bool,
    /// Notify on processing errors.
    pub error_alerts: bool,
    /// Send a weekly summary.
    pub weekly_report: bool,
    /// OpenAI API key.
    pub openai_key: String,
    /// Anthropic API key.
    pub anthropic_key: String,
    /// Infura project key.
    pub infura_key: String,
    /// Alchemy API key.
    pub alchemy_key: String,
    /// Request analysis right after an upload.
    pub auto_analyze: bool,
    /// Largest accepted upload in megabytes.
    pub max_file_size_mb: u64,
    /// Days to keep processed files.
    pub retention_days: u32,
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("language", &self.language)
            .field("theme", &self.theme)
            .field("timezone", &self.timezone)
            .field("email_notifications", &self.email_notifications)
            .field("analysis_complete", &self.analysis_complete)
            .field("error_alerts", &self.error_alerts)
            .field("weekly_report", &self.weekly_report)
            .field("openai_key", &masked(&self.openai_key))
            .field("anthropic_key", &masked(&self.anthropic_key))
            .field("infura_key", &masked(&self.infura_key))
            .field("alchemy_key", &masked(&self.alchemy_key))
            .field("auto_analyze", &self.auto_analyze)
            .field("max_file_size_mb", &self.max_file_size_mb)
            .field("retention_days", &self.retention_days)
            .finish()
    }
}

const fn masked(key: &str) -> &'static str {
    if key.is_empty() { "" } else { "<redacted>" }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            theme: Theme::Light,
            timezone: "UTC".to_string(),
            email_notifications: true,
            analysis_complete: true,
            error_alerts: true,
            weekly_report: false,
            openai_key: String::new(),
            anthropic_key: String::new(),
            infura_key: String::new(),
            alchemy_key: String::new(),
            auto_analyze: true,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl Settings {
    /// Upload limit in bytes.
    #[must_use]
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Settings slice: the edited draft and the last saved copy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsState {
    /// Values being edited.
    pub draft: Settings,
    /// Values in effect.
    pub saved: Settings,
}

impl SettingsState {
    /// Whether the draft differs from the saved values.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.draft != self.saved
    }
}

/// Commit the draft.
pub fn save(state: &mut SettingsState) {
    state.saved = state.draft.clone();
}

/// Restore defaults for both draft and saved values.
pub fn reset(state: &mut SettingsState) {
    state.draft = Settings::default();
    state.saved = Settings::default();
}

/// Observable handle over [`SettingsState`].
#[derive(Clone, Debug, Default)]
pub struct SettingsStore {
    slice: Slice<SettingsState>,
}

impl SettingsStore {
    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SettingsState {
        self.slice.snapshot()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<SettingsState> {
        self.slice.subscribe()
    }

    /// Settings currently in effect.
    #[must_use]
    pub fn current(&self) -> Settings {
        self.slice.read(|state| state.saved.clone())
    }

    /// Edit the draft.
    pub fn update(&self, edit: impl FnOnce(&mut Settings)) {
        self.slice.update(|state| edit(&mut state.draft));
    }

    /// See [`save`].
    pub fn save(&self) {
        self.slice.update(save);
    }

    /// See [`reset`].
    pub fn reset(&self) {
        self.slice.update(reset);
    }
}
