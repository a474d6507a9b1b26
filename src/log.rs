//! Conditional logging macros.
//!
//! With the `tracing` feature enabled these re-export the `tracing` macros;
//! without it they expand to nothing, so the renderer can sprinkle debug
//! output with zero cost in default builds.

#[cfg(feature = "tracing")]
pub use tracing::{debug, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{debug, warn};
