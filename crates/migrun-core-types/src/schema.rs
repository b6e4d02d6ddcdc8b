//! Canonical schema constants for structured logging
//!
//! These constants keep field names consistent between the logging macros,
//! the runner, and tests that assert on captured events.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Migration identifiers
pub const FIELD_MIGRATION: &str = "migration";

// Run counters
pub const FIELD_APPLIED: &str = "applied";
pub const FIELD_FAILED: &str = "failed";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
