//! # Splitgrid Core
//!
//! Grid layout engine for Splitgrid, a split view that arranges independent
//! content panes into a resizable grid.
//! This crate provides the pane registry, the packing solver, the ratio model
//! and drag controller, and the snapshot codec that makes a layout
//! reproducible across reloads.
//!
//! ## Architecture
//!
//! One [`GridSession`] owns all engine state for a logical session:
//! - User actions mutate the registry or the ratio model
//! - The packing solver recomputes cell assignments into a [`GridPlan`]
//! - Renderers consume the plan and the ratios; they never assign cells
//! - Every structural change is snapshotted into a [`StateStore`]
//!
//! ## Example
//!
//! ```rust
//! use splitgrid_core::layout::{GridShape, LaunchParams, PackDirection};
//! use splitgrid_core::{Config, GridSession, MemoryStore};
//!
//! let config = Config::default();
//! let params = LaunchParams::from_query("?mode=quad");
//! let mut session = GridSession::start("tab-1", params, &config.grid, MemoryStore::new());
//! assert_eq!(session.plan().shape, GridShape::new(2, 2));
//!
//! assert!(session.close_pane(2, Some(PackDirection::Horizontal)));
//! assert_eq!(session.registry().active(), &[0, 1, 3]);
//! ```

pub mod config;
pub mod drag;
pub mod error;
pub mod layout;
pub mod navigation;
pub mod packing;
pub mod ratio;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod storage;

pub use config::Config;
pub use drag::{DragController, DragEffect, DragState};
pub use error::{Error, Result};
pub use layout::{LaunchParams, PackingMode, SessionMode, MAX_PANES};
pub use packing::GridPlan;
pub use ratio::RatioModel;
pub use registry::PaneRegistry;
pub use session::GridSession;
pub use snapshot::Snapshot;
pub use storage::{FileStore, MemoryStore, StateStore, StoredState};

use tracing_subscriber::filter::LevelFilter;

/// Initialize tracing for the application
///
/// This sets up structured logging with the default level.
///
/// # Example
///
/// ```rust
/// splitgrid_core::init_tracing();
/// tracing::info!("Application started");
/// ```
pub fn init_tracing() {
    // A subscriber may already be installed; keep it.
    let _ = tracing_subscriber::fmt::try_init();
}

/// Initialize tracing with a maximum level such as `"debug"`.
///
/// Unknown levels fall back to `info`.
pub fn init_tracing_with_level(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let _ = tracing_subscriber::fmt().with_max_level(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing() {
        // Should not panic
        init_tracing();
        init_tracing_with_level("debug");
        init_tracing_with_level("nonsense");
    }
}
