//! Structured logging field names for llog.
//!
//! The constants below are the field-name contract shared by every crate,
//! so a log aggregator can query the same key regardless of which
//! subsystem emitted the event.
//!
//! ## Level conventions
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, needs operator attention |
//! | WARN  | Recoverable issue, a fallback was applied |
//! | INFO  | Lifecycle events and operation completions |
//! | DEBUG | Branch decisions and intermediate state |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Correlation ───────────────────────────────────────────────────────────

/// UUIDv7 tying a log line back to the HTTP request (or job) that
/// caused it, across crate boundaries.
pub const REQUEST_ID: &str = "request_id";

/// Which crate emitted the event.
/// Values: "api", "db", "notion", "inference", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Finer-grained origin within a subsystem.
/// Examples: "registry", "folders", "openai", "pool", "worker"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "list_items", "move_item", "refresh", "claim_next"
pub const OPERATION: &str = "op";

// ─── Registry entities ─────────────────────────────────────────────────────

/// The item an operation touched.
pub const ITEM_ID: &str = "item_id";

/// The job a worker line concerns.
pub const JOB_ID: &str = "job_id";

/// Job type enum variant.
pub const JOB_TYPE: &str = "job_type";

/// Folder path an operation touched.
pub const FOLDER: &str = "folder";

// ─── Timing and counts ─────────────────────────────────────────────────────

/// Elapsed wall-clock time, in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// How many rows a listing or query returned.
pub const RESULT_COUNT: &str = "result_count";

/// How many items a folder-wide operation rewrote.
pub const MOVED_COUNT: &str = "moved_count";

/// Size of a prompt or fetched document, in bytes.
pub const PROMPT_LEN: &str = "prompt_len";

/// Size of a model reply, in bytes.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Connection pool ───────────────────────────────────────────────────────

/// Open connections, active plus idle.
pub const POOL_SIZE: &str = "pool_size";

/// Connections currently idle.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Inference ─────────────────────────────────────────────────────────────

/// Model that served a generation call.
pub const MODEL: &str = "model";

// ─── Outcome ───────────────────────────────────────────────────────────────

/// `true`/`false` operation outcome.
pub const SUCCESS: &str = "success";

/// Why an operation failed, when it did.
pub const ERROR_MSG: &str = "error";
