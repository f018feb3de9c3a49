//! Input validation performed before any request is issued.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static ADDRESS_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").ok());
static TX_HASH_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{64}$").ok());

/// Smallest and largest accepted crawl depth.
pub const CRAWL_DEPTH_RANGE: (u32, u32) = (1, 5);
/// Smallest and largest accepted crawl page budget.
pub const CRAWL_PAGES_RANGE: (u32, u32) = (1, 1000);
/// File extensions accepted for upload.
pub const UPLOAD_EXTENSIONS: [&str; 7] = ["csv", "xlsx", "xls", "json", "xml", "pdf", "txt"];

/// Rejected user input. The display text is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No address was entered.
    #[error("Please enter an Ethereum address")]
    MissingAddress,
    /// The address is not `0x` followed by 40 hex digits.
    #[error("Invalid Ethereum address format")]
    InvalidAddress {
        /// Rejected input.
        value: String,
    },
    /// No contract address was entered.
    #[error("Please enter a contract address")]
    MissingContract,
    /// The contract address is not `0x` followed by 40 hex digits.
    #[error("Invalid contract address format")]
    InvalidContract {
        /// Rejected input.
        value: String,
    },
    /// No transaction hash was entered.
    #[error("Please enter a transaction hash")]
    MissingTxHash,
    /// The hash is not `0x` followed by 64 hex digits.
    #[error("Invalid transaction hash format")]
    InvalidTxHash {
        /// Rejected input.
        value: String,
    },
    /// No block number was entered.
    #[error("Please enter a block number")]
    MissingBlock,
    /// The block number is not an unsigned integer.
    #[error("Invalid block number")]
    InvalidBlock {
        /// Rejected input.
        value: String,
    },
    /// No URL was entered.
    #[error("Please enter a URL")]
    MissingUrl,
    /// The URL list contained no usable entries.
    #[error("Please enter at least one URL")]
    MissingUrls,
    /// No crawl start URL was entered.
    #[error("Please enter a starting URL")]
    MissingStartUrl,
    /// Crawl depth outside the accepted range.
    #[error("Crawl depth must be between 1 and 5")]
    CrawlDepth {
        /// Rejected depth.
        value: u32,
    },
    /// Crawl page budget outside the accepted range.
    #[error("Max pages must be between 1 and 1000")]
    CrawlPages {
        /// Rejected budget.
        value: u32,
    },
    /// Concurrent request limit of zero.
    #[error("Max concurrent requests must be at least 1")]
    Concurrency,
    /// File extension not accepted for upload.
    #[error("Unsupported file type")]
    UnsupportedFileType {
        /// Rejected filename.
        filename: String,
    },
    /// Payload larger than the configured limit.
    #[error("File exceeds the maximum upload size")]
    FileTooLarge {
        /// Payload size in bytes.
        size: u64,
        /// Limit in bytes.
        limit: u64,
    },
}

/// Ethereum account address, matched exactly as entered.
///
/// # Errors
///
/// Empty input or anything other than `0x` plus 40 hex digits.
pub fn eth_address(input: &str) -> Result<String, ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::MissingAddress);
    }
    if !matches_pattern(&ADDRESS_RE, input) {
        return Err(ValidationError::InvalidAddress {
            value: input.to_string(),
        });
    }
    Ok(input.to_string())
}

/// Contract address; same shape as an account address.
///
/// # Errors
///
/// Empty input or anything other than `0x` plus 40 hex digits.
pub fn contract_address(input: &str) -> Result<String, ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::MissingContract);
    }
    if !matches_pattern(&ADDRESS_RE, input) {
        return Err(ValidationError::InvalidContract {
            value: input.to_string(),
        });
    }
    Ok(input.to_string())
}

/// Transaction hash, matched exactly as entered.
///
/// # Errors
///
/// Empty input or anything other than `0x` plus 64 hex digits.
pub fn tx_hash(input: &str) -> Result<String, ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::MissingTxHash);
    }
    if !matches_pattern(&TX_HASH_RE, input) {
        return Err(ValidationError::InvalidTxHash {
            value: input.to_string(),
        });
    }
    Ok(input.to_string())
}

/// Block height.
///
/// # Errors
///
/// Empty input or text that is not an unsigned integer.
pub fn block_number(input: &str) -> Result<u64, ValidationError> {
    let value = input.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingBlock);
    }
    value
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidBlock {
            value: value.to_string(),
        })
}

/// Trimmed single URL.
///
/// # Errors
///
/// Blank input.
pub fn url(input: &str) -> Result<String, ValidationError> {
    non_blank(input).ok_or(ValidationError::MissingUrl)
}

/// Trimmed crawl start URL.
///
/// # Errors
///
/// Blank input.
pub fn start_url(input: &str) -> Result<String, ValidationError> {
    non_blank(input).ok_or(ValidationError::MissingStartUrl)
}

/// One URL per line; blank lines are discarded.
///
/// # Errors
///
/// No non-blank lines.
pub fn url_list(input: &str) -> Result<Vec<String>, ValidationError> {
    let urls: Vec<String> = input.lines().filter_map(non_blank).collect();
    if urls.is_empty() {
        return Err(ValidationError::MissingUrls);
    }
    Ok(urls)
}

/// Crawl depth within [`CRAWL_DEPTH_RANGE`].
///
/// # Errors
///
/// Depth outside the range.
pub fn crawl_depth(value: u32) -> Result<u32, ValidationError> {
    if value < CRAWL_DEPTH_RANGE.0 || value > CRAWL_DEPTH_RANGE.1 {
        return Err(ValidationError::CrawlDepth { value });
    }
    Ok(value)
}

/// Crawl page budget within [`CRAWL_PAGES_RANGE`].
///
/// # Errors
///
/// Budget outside the range.
pub fn crawl_pages(value: u32) -> Result<u32, ValidationError> {
    if value < CRAWL_PAGES_RANGE.0 || value > CRAWL_PAGES_RANGE.1 {
        return Err(ValidationError::CrawlPages { value });
    }
    Ok(value)
}

/// Non-zero concurrency limit for batch scrapes.
///
/// # Errors
///
/// Zero.
pub fn max_concurrent(value: u32) -> Result<u32, ValidationError> {
    if value == 0 {
        return Err(ValidationError::Concurrency);
    }
    Ok(value)
}

/// Accepted extension and size for an upload.
///
/// # Errors
///
/// Unknown extension or a payload above `limit_bytes`.
pub fn upload_file(filename: &str, size: u64, limit_bytes: u64) -> Result<(), ValidationError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let accepted = extension
        .as_deref()
        .is_some_and(|ext| UPLOAD_EXTENSIONS.contains(&ext));
    if !accepted {
        return Err(ValidationError::UnsupportedFileType {
            filename: filename.to_string(),
        });
    }
    if size > limit_bytes {
        return Err(ValidationError::FileTooLarge {
            size,
            limit: limit_bytes,
        });
    }
    Ok(())
}

fn matches_pattern(pattern: &Lazy<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

fn non_blank(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
