pub(crate) mod chain;
pub(crate) mod files;
pub(crate) mod jobs;
pub(crate) mod scrape;
pub(crate) mod session;
pub(crate) mod system;
