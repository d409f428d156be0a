//! The crate's only configuration surface: trace verbosity thresholds.
//!
//! `sat`/`sat3`/`dpll` each take a `trace: u8` level in `0..=5`. This module
//! is the one place that number is interpreted; callers elsewhere just pass
//! it through. The crate never installs a logger itself — emitting through
//! the `log` facade and leaving subscription to the embedding application is
//! the same library/binary split this crate draws around encoders and CLIs.

/// Literal assignments (`DagLit`/`DagNot` leaf settles).
pub const TRACE_ASSIGN: u8 = 1;
/// Contradictions discovered during propagation.
pub const TRACE_CONTRADICTION: u8 = 2;
/// `sat3` opening or resolving a hypothesis on a variant slot.
pub const TRACE_VARIANT: u8 = 3;
/// Promotion of a slot from tentative to permanent via a `sure` flag.
pub const TRACE_SURE: u8 = 4;

fn level_for(threshold: u8) -> log::Level {
    match threshold {
        0 | 1 => log::Level::Debug,
        2 => log::Level::Warn,
        3 => log::Level::Info,
        _ => log::Level::Trace,
    }
}

/// Emits `msg` through the `log` facade at the level associated with
/// `threshold`, but only when the caller's `trace` setting is at least that
/// verbose. `0` disables every event.
pub fn emit(trace: u8, threshold: u8, msg: impl FnOnce() -> String) {
    if trace >= threshold && trace > 0 {
        log::log!(level_for(threshold), "{}", msg());
    }
}
