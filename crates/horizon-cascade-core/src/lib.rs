//! Reactive primitives for Horizon Cascade.
//!
//! This crate provides the building blocks the cascade engine uses to
//! publish changes:
//!
//! - **Signals**: subscriber tables with RAII disconnection
//! - **Value cells**: shared, observable values that back style rules
//! - **Logging**: `tracing` target names for every subsystem
//!
//! # Example
//!
//! ```
//! use horizon_cascade_core::ValueCell;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let cell = ValueCell::new(4.0_f32);
//! let seen = Arc::new(AtomicUsize::new(0));
//! let seen_clone = seen.clone();
//! let _guard = cell.subscribe(move |_| {
//!     seen_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert!(cell.set(8.0));
//! assert!(!cell.set(8.0));
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

pub mod cell;
mod error;
pub mod logging;
pub mod signal;

pub use cell::ValueCell;
pub use error::SignalError;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
