//! Fake collaborators for the client's auth seams.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use datanex_client::{LoginRedirect, MemoryTokenStore, TokenStore};

/// Login redirect that counts how often it fired.
#[derive(Debug, Default)]
pub struct RecordingRedirect {
    hits: AtomicUsize,
}

impl RecordingRedirect {
    /// Number of redirects issued so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Auth collaborators handed to a client under test.
pub struct AuthFakes {
    /// Token store seeded by the test.
    pub tokens: Arc<MemoryTokenStore>,
    /// Records login redirects.
    pub redirect: Arc<RecordingRedirect>,
}

impl AuthFakes {
    /// Fakes with an empty token store.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            tokens: Arc::new(MemoryTokenStore::default()),
            redirect: Arc::new(RecordingRedirect::default()),
        }
    }

    /// Fakes with `token` already stored.
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self {
            tokens: Arc::new(MemoryTokenStore::with_token(token)),
            redirect: Arc::new(RecordingRedirect::default()),
        }
    }

    /// Whether the token store currently holds a token.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.tokens.load().is_some()
    }
}
