//! Tracing targets used throughout Horizon Cascade.
//!
//! Horizon Cascade logs through the `tracing` crate and never installs a
//! subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_cascade=debug")
//!     .init();
//! ```
//!
//! Mutations are logged at `debug`, event dispatch and memo activity at
//! `trace`, and refused structural operations at `warn`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot dispatch.
    pub const SIGNAL: &str = "horizon_cascade_core::signal";
    /// Reactive value cells.
    pub const CELL: &str = "horizon_cascade_core::cell";
    /// Local rule storage (`set` / `clear`).
    pub const RULES: &str = "horizon_cascade::rules";
    /// Dependency chain edits and shadow analysis.
    pub const CHAIN: &str = "horizon_cascade::chain";
    /// Stateful view resolution and memoization.
    pub const VIEW: &str = "horizon_cascade::view";
    /// Group tree restructuring and membership.
    pub const GROUP: &str = "horizon_cascade::group";
}
