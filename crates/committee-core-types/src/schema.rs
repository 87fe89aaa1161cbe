//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names stable across the orchestrators and the
//! test capture layer.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Entity identifiers
pub const FIELD_COMMITTEE_UID: &str = "committee_uid";
pub const FIELD_MEMBER_UID: &str = "member_uid";
pub const FIELD_PROJECT_UID: &str = "project_uid";
pub const FIELD_KEY: &str = "key";
pub const FIELD_SUBJECT: &str = "subject";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_RESERVATION_LEAK: &str = "reservation_leak";
pub const EVENT_PUBLISH_FAILED: &str = "publish_failed";
