//! Logging macros that forward to `defmt` when the `defmt` feature is enabled.
//!
//! With the feature off the arguments are still type-checked but nothing is emitted,
//! so host builds link without a global logger.
//!
//! The macros are textually scoped (`#[macro_use]` in `lib.rs`), so this module must
//! stay the first one declared.

macro_rules! log_with {
    ($level:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($fmt $(, $arg)*);
        #[cfg(not(feature = "defmt"))]
        let _ = ($fmt, $(&$arg),*);
    }};
}

macro_rules! trace {
    ($($arg:tt)*) => { log_with!(trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { log_with!(debug, $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { log_with!(info, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { log_with!(warn, $($arg)*) };
}
