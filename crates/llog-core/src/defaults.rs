//! Centralized default constants for the llog system.
//!
//! **This module is the single source of truth** for all shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page number for registry listings (pages are 1-indexed).
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size for registry listings.
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Page sizes the HTTP layer accepts for registry listings.
pub const ALLOWED_PER_PAGE: [i64; 4] = [5, 10, 25, 50];

// =============================================================================
// METADATA GENERATION
// =============================================================================

/// Maximum characters of item content sent to the metadata backend.
///
/// Keeps prompts well under typical model context limits while giving the
/// model enough of the document to describe it.
pub const METADATA_SAMPLE_CHARS: usize = 4000;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Maximum request body size in bytes (2 MB; registry requests are small).
pub const MAX_BODY_SIZE_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default maximum retry count for queued jobs.
///
/// Zero: a failed refresh surfaces to the user immediately and is
/// re-triggered manually. The queue still honors a per-row
/// `max_retries` when one is set.
pub const JOB_MAX_RETRIES: i32 = 0;

/// Default job worker poll interval in milliseconds.
pub const JOB_POLL_INTERVAL_MS: u64 = 1000;

/// Default maximum concurrent jobs per worker.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Default job execution timeout in seconds (5 minutes).
pub const JOB_TIMEOUT_SECS: u64 = 300;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// ORIGIN FETCH
// =============================================================================

/// Timeout for Notion API requests in seconds.
pub const NOTION_TIMEOUT_SECS: u64 = 30;

/// Notion API version header value sent with every request.
pub const NOTION_VERSION: &str = "2022-06-28";

// =============================================================================
// INFERENCE
// =============================================================================

/// Timeout for metadata generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_are_consistent() {
        assert_eq!(DEFAULT_PAGE, 1);
        assert!(ALLOWED_PER_PAGE.contains(&DEFAULT_PER_PAGE));
        assert!(ALLOWED_PER_PAGE.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn metadata_sample_is_bounded() {
        assert!(METADATA_SAMPLE_CHARS >= 1000);
        assert!(METADATA_SAMPLE_CHARS <= 16_000);
    }

    #[test]
    fn job_defaults_are_sane() {
        assert!(JOB_MAX_CONCURRENT >= 1);
        assert!(JOB_POLL_INTERVAL_MS >= 100);
        assert!(JOB_TIMEOUT_SECS > NOTION_TIMEOUT_SECS);
    }
}
