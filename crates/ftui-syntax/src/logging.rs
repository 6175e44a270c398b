#![forbid(unsafe_code)]

//! Logging and tracing support.
//!
//! Re-exports the `tracing` macros the engine uses when the `tracing` feature
//! is enabled. When the feature is disabled, no-op macros are re-exported
//! under the same names so call sites compile unchanged.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, debug_span, trace, warn};

// When tracing is not enabled, provide no-op macros. They carry their own
// names because a bare `warn` import is ambiguous with the lint attribute.
#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// No-op debug macro when tracing is disabled.
    macro_rules! noop_debug {
        ($($arg:tt)*) => {};
    }

    /// No-op debug_span macro when tracing is disabled.
    macro_rules! noop_debug_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// No-op trace macro when tracing is disabled.
    macro_rules! noop_trace {
        ($($arg:tt)*) => {};
    }

    /// No-op warn macro when tracing is disabled.
    macro_rules! noop_warn {
        ($($arg:tt)*) => {};
    }

    pub(crate) use noop_debug as debug;
    pub(crate) use noop_debug_span as debug_span;
    pub(crate) use noop_trace as trace;
    pub(crate) use noop_warn as warn;
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop_macros::{debug, debug_span, trace, warn};

/// A no-op span for when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub(crate) struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Enter the no-op span (does nothing).
    pub(crate) fn entered(self) -> NoopGuard {
        NoopGuard
    }
}

/// A no-op span guard.
#[cfg(not(feature = "tracing"))]
pub(crate) struct NoopGuard;
