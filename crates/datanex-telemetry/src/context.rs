//! Spans carrying command context.

use tracing::Span;

use crate::init::build_sha;

/// Span wrapping one CLI command so nested events carry its name and build.
#[must_use]
pub fn command_span(command: &str) -> Span {
    tracing::info_span!("command", name = %command, build_sha = %build_sha())
}
