#![deny(missing_docs)]
//! Shared logging utilities for the gallery workspace.
//!
//! This crate provides the `gallery_*` logging macros used across the codebase,
//! a request-scoped log context, and a minimal test initializer for the global
//! logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Request id currently being served on this thread, if any.
    static CURRENT_REQUEST: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Marks `request_id` as the request being served on the current thread.
///
/// Log lines emitted through the `gallery_*` macros are prefixed with
/// `[req N]` until [`clear_request_context`] is called.
pub fn set_request_context(request_id: u64) {
    CURRENT_REQUEST.with(|v| v.set(Some(request_id)));
}

/// Clears the request context of the current thread.
pub fn clear_request_context() {
    CURRENT_REQUEST.with(|v| v.set(None));
}

/// Returns the request id set for the current thread, if any.
pub fn current_request() -> Option<u64> {
    CURRENT_REQUEST.with(|v| v.get())
}

/// Guard that sets the request context and restores the previous one on drop.
#[derive(Debug)]
pub struct RequestScope {
    previous: Option<u64>,
}

impl RequestScope {
    /// Enters the context of `request_id` for the lifetime of the guard.
    pub fn enter(request_id: u64) -> Self {
        let previous = current_request();
        set_request_context(request_id);
        Self { previous }
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        CURRENT_REQUEST.with(|v| v.set(self.previous));
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __gallery_log {
    ($level:ident, $($arg:tt)*) => {{
        match $crate::current_request() {
            Some(request_id) => {
                $crate::log::$level!("[req {}] {}", request_id, format_args!($($arg)*))
            }
            None => $crate::log::$level!($($arg)*),
        }
    }};
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_trace {
    ($($arg:tt)*) => {
        $crate::__gallery_log!(trace, $($arg)*)
    };
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_debug {
    ($($arg:tt)*) => {
        $crate::__gallery_log!(debug, $($arg)*)
    };
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_info {
    ($($arg:tt)*) => {
        $crate::__gallery_log!(info, $($arg)*)
    };
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_warn {
    ($($arg:tt)*) => {
        $crate::__gallery_log!(warn, $($arg)*)
    };
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_error {
    ($($arg:tt)*) => {
        $crate::__gallery_log!(error, $($arg)*)
    };
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
