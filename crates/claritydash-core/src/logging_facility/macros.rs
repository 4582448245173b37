//! Boundary logging macros
//!
//! Every store operation emits one `start` event and then exactly one of
//! `end` or `end_error`, all carrying `component`, `op` and `event`.
//!
//! Entity context is passed typed rather than as raw fields:
//! - `entity = T` records `entity_type` from `<T as Entity>::ENTITY_TYPE`
//! - `entity = T, key = k` also records `entity_key` from a `&EntityKey`
//!
//! `log_op_end!` and `log_op_error!` take `since = <Instant>` and record
//! `duration_ms`. Any further `name = value` tracing fields may follow.
//! Expansions resolve through `$crate`, so call sites need only this crate.

/// Shared expansion for the three boundary macros
///
/// `[...]` holds fields placed before the entity context, each followed by
/// a comma.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $event:ident, $op:expr, [$($pre:tt)*], entity = $ty:ty, key = $key:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::$event,
            $($pre)*
            entity_type = <$ty as $crate::model::Entity>::ENTITY_TYPE,
            entity_key = $crate::model::EntityKey::as_str($key),
            $($($field)*)?
        )
    };
    ($level:ident, $event:ident, $op:expr, [$($pre:tt)*], entity = $ty:ty $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::$event,
            $($pre)*
            entity_type = <$ty as $crate::model::Entity>::ENTITY_TYPE,
            $($($field)*)?
        )
    };
    ($level:ident, $event:ident, $op:expr, [$($pre:tt)*] $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::$event,
            $($pre)*
            $($($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use claritydash_core::{log_op_start, EntityKey, User};
/// let key = EntityKey::parse("a@example.com").unwrap();
/// log_op_start!("entity_list", entity = User);
/// log_op_start!("entity_read", entity = User, key = &key);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($rest:tt)*)?) => {
        $crate::__log_op_event!(info, EVENT_START, $op, [] $(, $($rest)*)?)
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use claritydash_core::{log_op_end, User};
/// let start = std::time::Instant::now();
/// log_op_end!("entity_count", since = start, entity = User, key_count = 2);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, since = $start:expr $(, $($rest:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            EVENT_END,
            $op,
            [duration_ms = $crate::logging_facility::elapsed_ms($start),]
            $(, $($rest)*)?
        )
    };
}

/// Log an operation failure with its error kind and code
///
/// Accepts anything convertible into `ExError`.
///
/// # Example
///
/// ```
/// # use claritydash_core::{log_op_error, errors::StoreError, EntityKey, User};
/// let start = std::time::Instant::now();
/// let key = EntityKey::parse("a@example.com").unwrap();
/// let err = StoreError::NotFound { entity_type: "user".into(), key: key.to_string() };
/// log_op_error!("entity_read", err, since = start, entity = User, key = &key);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, since = $start:expr $(, $($rest:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error,
            EVENT_END_ERROR,
            $op,
            [
                duration_ms = $crate::logging_facility::elapsed_ms($start),
                err_kind = ?ex_err.kind(),
                err_code = ex_err.code(),
            ]
            $(, $($rest)*)?
        )
    }};
}
