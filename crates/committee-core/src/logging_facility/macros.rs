//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use committee_core::log_op_start;
/// log_op_start!("create_committee");
/// log_op_start!("create_committee", project_uid = "p1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use committee_core::log_op_end;
/// log_op_end!("create_committee", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// # Example
///
/// ```
/// # use committee_core::{log_op_error, errors::CommitteeError};
/// let err = CommitteeError::CommitteeNotFound { uid: "c1".to_string() };
/// log_op_error!("update_committee", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            error = %ex_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            error = %ex_err,
            $($field)*
        );
    }};
}

/// Log a reservation key that could not be released
///
/// The claimed name stays locked until an operator removes the key, so this
/// is always emitted at error level.
#[macro_export]
macro_rules! log_reservation_leak {
    ($op:expr, $key:expr, $err:expr) => {
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_RESERVATION_LEAK,
            key = %$key,
            error = %$err,
            "reservation key leaked, value stays locked",
        );
    };
}

/// Log a swallowed downstream publish failure
#[macro_export]
macro_rules! log_publish_failure {
    ($op:expr, $err:expr) => {
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_PUBLISH_FAILED,
            error = %$err,
            "downstream publish failed, continuing",
        );
    };
    ($op:expr, $err:expr, $($field:tt)*) => {
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::committee_core_types::schema::EVENT_PUBLISH_FAILED,
            error = %$err,
            $($field)*
        );
    };
}
