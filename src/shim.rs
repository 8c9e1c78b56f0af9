//! Shim module to abstract over std and loom primitives.
//!
//! Every blocking and atomic primitive in the crate is imported from here, so
//! the `loom` feature swaps the whole backend at build time: `std::sync` for
//! production, `loom::sync` for model checking. The semaphore built on top
//! keeps the same wait/post semantics and error values for both backends.

#[cfg(not(feature = "loom"))]
pub mod atomic {
    pub use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
}

#[cfg(feature = "loom")]
pub mod atomic {
    pub use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
}

#[cfg(not(feature = "loom"))]
pub mod sync {
    pub use std::sync::{Arc, Condvar, Mutex, MutexGuard};
}

#[cfg(feature = "loom")]
pub mod sync {
    pub use loom::sync::{Arc, Condvar, Mutex, MutexGuard};
}
