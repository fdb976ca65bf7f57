//! # Grid sessions
//!
//! A [`GridSession`] owns the whole engine state of one logical session:
//! pane registry, ratio model, drag controller, packing mode and the current
//! [`GridPlan`]. Every structural mutation runs to completion and is followed
//! by a snapshot of the session's own `splitTabStates` entry.
//!
//! Invalid requests (closing the last pane, dragging a splitter that does not
//! exist, and so on) leave the session untouched; the public entry points
//! report them as `false` and log the reason at `debug`.

use crate::config::GridConfig;
use crate::drag::{DragController, DragEffect, DragState};
use crate::layout::{Axis, GridShape, LaunchParams, PackDirection, PackingMode, PaneIndex};
use crate::navigation::{normalize_address, NavigationHistory, BLANK_ADDRESS};
use crate::packing::{self, GridPlan, SolverInput};
use crate::ratio::RatioModel;
use crate::registry::PaneRegistry;
use crate::snapshot::{RestoredLayout, Snapshot};
use crate::storage::{LastSession, StateStore, StoredState};
use crate::{rejected, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Generate a fresh session id.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Engine state of one session, bound to a [`StateStore`].
#[derive(Debug)]
pub struct GridSession<S: StateStore> {
    session_id: String,
    params: LaunchParams,
    max_panes: usize,
    registry: PaneRegistry,
    ratios: RatioModel,
    drag: DragController,
    packing: PackingMode,
    plan: GridPlan,
    store: S,
    last_reset_token: Option<i64>,
}

impl<S: StateStore> GridSession<S> {
    /// Start a session.
    ///
    /// Reads the shared state, seeds pane addresses from `splitUrls`, takes
    /// and clears `pendingLayoutState`, then restores from the pending
    /// snapshot (or this session's own stored snapshot). Without a usable
    /// snapshot the uniform layout is computed. The result is snapshotted
    /// before returning.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::config::GridConfig;
    /// use splitgrid_core::layout::{GridShape, LaunchParams, SessionMode};
    /// use splitgrid_core::session::GridSession;
    /// use splitgrid_core::storage::MemoryStore;
    ///
    /// let params = LaunchParams::new(SessionMode::Quad, None);
    /// let session = GridSession::start("tab-1", params, &GridConfig::default(), MemoryStore::new());
    /// assert_eq!(session.plan().shape, GridShape::new(2, 2));
    /// ```
    pub fn start(
        session_id: impl Into<String>,
        params: LaunchParams,
        config: &GridConfig,
        mut store: S,
    ) -> Self {
        let session_id = session_id.into();
        let defaults;
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("Invalid grid settings, using defaults: {}", e);
                defaults = GridConfig::default();
                &defaults
            }
        };
        let state = store.load().unwrap_or_else(|e| {
            warn!("Failed to load stored state, starting empty: {}", e);
            StoredState::default()
        });

        let max_panes = config.max_panes;
        let registry = seed_registry(params, max_panes, state.split_urls());

        let pending = state.pending_layout_state().cloned();
        if pending.is_some() {
            let cleared = store.update(|state| {
                state.take_pending_layout_state();
                Ok(())
            });
            if let Err(e) = cleared {
                warn!("Failed to clear pending layout state: {}", e);
            }
        }
        let candidate = pending.or_else(|| state.tab_state(&session_id).cloned());

        let mut session = Self {
            session_id,
            params,
            max_panes,
            registry,
            ratios: RatioModel::default(),
            drag: DragController::new(config.drag_min_fraction),
            packing: PackingMode::Uniform,
            plan: GridPlan {
                shape: GridShape::single(),
                placements: Vec::new(),
            },
            store,
            last_reset_token: state.reset_request().map(|r| r.token),
        };

        info!(
            "Starting session {} ({}, {} panes)",
            session.session_id,
            params.mode,
            session.registry.capacity()
        );

        match candidate {
            Some(value) => {
                session.restore_or_fall_back(value);
            }
            None => session.update_layout(true),
        }
        session.persist();
        session
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn params(&self) -> LaunchParams {
        self.params
    }

    pub fn plan(&self) -> &GridPlan {
        &self.plan
    }

    pub fn ratios(&self) -> &RatioModel {
        &self.ratios
    }

    pub fn registry(&self) -> &PaneRegistry {
        &self.registry
    }

    pub fn packing(&self) -> PackingMode {
        self.packing
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Current address of every pane slot, index aligned.
    pub fn urls(&self) -> Vec<String> {
        (0..self.registry.capacity())
            .map(|i| {
                self.registry
                    .pane(i)
                    .map(|p| p.history().current().to_string())
                    .unwrap_or_else(|| BLANK_ADDRESS.to_string())
            })
            .collect()
    }

    /// Current record of the layout. Pure.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            self.params,
            &self.registry,
            &self.plan,
            &self.ratios,
            self.packing,
            &self.urls(),
        )
    }

    /// Solve the grid for the current registry and packing mode.
    ///
    /// Ratios reset to uniform when `force_reset` is set or when the shape
    /// changed. An active drag is dropped on shape change.
    pub fn update_layout(&mut self, force_reset: bool) {
        let coordinates = self.registry.coordinates();
        let plan = packing::solve(&SolverInput {
            active: self.registry.active(),
            coordinates: &coordinates,
            params: self.params,
            packing: self.packing,
        });

        for placement in &plan.placements {
            self.registry
                .set_coordinate(placement.pane, placement.span.origin());
        }

        let shape_changed = !self.ratios.matches(plan.shape);
        if shape_changed {
            self.drag.cancel();
        }
        if force_reset || shape_changed {
            self.ratios.reset(plan.shape.cols, plan.shape.rows);
        }

        debug!("Layout solved: {} for {} panes", plan.shape, plan.placements.len());
        self.plan = plan;
    }

    /// Close a pane and re-pack the rest along `direction` (inferred from
    /// the pane's neighbours when `None`).
    pub fn close_pane(&mut self, index: PaneIndex, direction: Option<PackDirection>) -> bool {
        match self.registry.close(index, direction) {
            Ok(direction) => {
                self.packing = PackingMode::AxisPacked(direction);
                self.update_layout(false);
                info!(
                    "Closed pane {}, packing {:?} into {}",
                    index, direction, self.plan.shape
                );
                self.persist();
                true
            }
            Err(e) => {
                debug!("Close ignored: {}", e);
                false
            }
        }
    }

    /// Start dragging the splitter after track `boundary` (0-based) on `axis`.
    pub fn begin_drag(&mut self, axis: Axis, boundary: usize) -> bool {
        match self.drag.begin(axis, boundary, &self.ratios) {
            Ok(()) => true,
            Err(e) => {
                debug!("Drag ignored: {}", e);
                false
            }
        }
    }

    /// Move the active splitter to a grid-normalized position.
    pub fn drag_move(&mut self, position: f64) -> DragEffect {
        self.drag.move_to(position, &mut self.ratios)
    }

    /// Release the splitter. Snapshots when a drag was active.
    pub fn end_drag(&mut self) -> bool {
        if !self.drag.end() {
            return false;
        }
        debug!(
            "Drag committed: cols {:?} rows {:?}",
            self.ratios.cols(),
            self.ratios.rows()
        );
        self.persist();
        true
    }

    /// Reset ratios to uniform for the current shape.
    pub fn reset_ratios(&mut self) {
        self.drag.cancel();
        let shape = self.plan.shape;
        self.ratios.reset(shape.cols, shape.rows);
        info!("Ratios reset for session {}", self.session_id);
        self.persist();
    }

    /// Act on a stored reset request addressed to this session.
    ///
    /// Each token is handled once. Returns `true` when a reset happened.
    pub fn poll_reset_request(&mut self) -> bool {
        let request = match self.store.load() {
            Ok(state) => state.reset_request(),
            Err(e) => {
                warn!("Failed to read reset request: {}", e);
                return false;
            }
        };
        let Some(request) = request else {
            return false;
        };
        if request.session_id != self.session_id || self.last_reset_token == Some(request.token) {
            return false;
        }

        self.last_reset_token = Some(request.token);
        info!("Handling reset request {}", request.token);
        self.reset_ratios();
        true
    }

    /// Apply an untrusted snapshot. On rejection the session falls back to a
    /// fresh uniform layout. Either way the result is snapshotted.
    ///
    /// Returns `true` when the snapshot was accepted.
    pub fn restore(&mut self, value: Value) -> bool {
        let accepted = self.restore_or_fall_back(value);
        self.persist();
        accepted
    }

    fn restore_or_fall_back(&mut self, value: Value) -> bool {
        let restored =
            Snapshot::from_value(value).and_then(|s| s.validate(self.params, self.registry.capacity()));
        match restored.and_then(|r| self.apply_restored(r)) {
            Ok(()) => {
                info!(
                    "Restored layout {} ({:?})",
                    self.plan.shape, self.packing
                );
                true
            }
            Err(e) => {
                warn!("Rejected stored layout, using uniform grid: {}", e);
                self.fall_back();
                false
            }
        }
    }

    fn apply_restored(&mut self, restored: RestoredLayout) -> Result<()> {
        self.drag.cancel();
        match restored.grid {
            Some(grid) => {
                // Ratios are applied first: they are the only step that can fail.
                self.ratios
                    .set_for_shape(grid.plan.shape, &grid.col_ratios, &grid.row_ratios)?;
                self.registry.replace(&restored.active, &restored.coordinates);
                for placement in &grid.plan.placements {
                    self.registry
                        .set_coordinate(placement.pane, placement.span.origin());
                }
                self.packing = restored.packing;
                self.plan = grid.plan;
            }
            None => {
                self.registry.replace(&restored.active, &restored.coordinates);
                self.packing = restored.packing;
                self.update_layout(true);
            }
        }
        Ok(())
    }

    fn fall_back(&mut self) {
        let urls = self.urls();
        self.registry = seed_registry(self.params, self.max_panes, &urls);
        self.packing = PackingMode::Uniform;
        self.update_layout(true);
    }

    /// Load an address into a pane. Input is normalized first (bare host
    /// names get `https://`, anything else becomes a search).
    ///
    /// Returns the address actually loaded.
    pub fn navigate(&mut self, index: PaneIndex, input: &str) -> Option<String> {
        let address = normalize_address(input);
        self.set_address(index, |history| {
            history.navigate(address.clone());
            Some(address.clone())
        })
    }

    /// Step a pane back through its history.
    pub fn go_back(&mut self, index: PaneIndex) -> Option<String> {
        self.set_address(index, |history| history.go_back().map(str::to_string))
    }

    fn set_address<F>(&mut self, index: PaneIndex, f: F) -> Option<String>
    where
        F: FnOnce(&mut NavigationHistory) -> Option<String>,
    {
        if !self.registry.is_active(index) {
            debug!("Navigation ignored: {}", rejected!("pane {} is not active", index));
            return None;
        }
        let address = self.registry.pane_mut(index).and_then(|p| f(p.history_mut()))?;

        let snapshot = self.snapshot();
        let session_id = self.session_id.clone();
        let url = address.clone();
        let saved = self.store.update(|state| {
            state.set_split_url(index, &url);
            state.set_tab_state(&session_id, &snapshot)
        });
        if let Err(e) = saved {
            warn!("Failed to persist address of pane {}: {}", index, e);
        }
        Some(address)
    }

    /// End the session: drop its `splitTabStates` entry and record it as
    /// `lastSession`. Returns the store.
    pub fn end(mut self) -> S {
        let last = LastSession {
            snapshot: self.snapshot(),
            closed_at: chrono::Utc::now().timestamp_millis(),
        };
        let session_id = self.session_id.clone();
        let saved = self.store.update(|state| {
            state.remove_tab_state(&session_id);
            state.set_last_session(&last)
        });
        match saved {
            Ok(()) => info!("Ended session {}", self.session_id),
            Err(e) => warn!("Failed to record end of session {}: {}", self.session_id, e),
        }
        self.store
    }

    fn persist(&mut self) {
        let snapshot = self.snapshot();
        let session_id = self.session_id.clone();
        if let Err(e) = self
            .store
            .update(|state| state.set_tab_state(&session_id, &snapshot))
        {
            warn!("Failed to save layout of session {}: {}", self.session_id, e);
        }
    }
}

fn seed_registry(params: LaunchParams, max_panes: usize, urls: &[String]) -> PaneRegistry {
    let mut registry = PaneRegistry::create_session(params.requested_count(), max_panes);
    for index in 0..registry.capacity() {
        let Some(url) = urls.get(index).filter(|u| !u.is_empty()) else {
            continue;
        };
        if let Some(pane) = registry.pane_mut(index) {
            *pane.history_mut() = NavigationHistory::starting_at(url.clone());
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{CellSpan, SessionMode};
    use crate::storage::{MemoryStore, ResetRequest};
    use serde_json::json;

    fn quad() -> LaunchParams {
        LaunchParams::new(SessionMode::Quad, None)
    }

    fn start(params: LaunchParams, store: MemoryStore) -> GridSession<MemoryStore> {
        GridSession::start("s1", params, &GridConfig::default(), store)
    }

    #[test]
    fn test_start_uniform_and_snapshotted() {
        let session = start(quad(), MemoryStore::new());
        assert_eq!(session.plan().shape, GridShape::new(2, 2));
        assert_eq!(session.packing(), PackingMode::Uniform);
        assert!(session.store().state().tab_state("s1").is_some());
    }

    #[test]
    fn test_invalid_grid_config_falls_back_to_defaults() {
        let config = GridConfig {
            max_panes: 0,
            drag_min_fraction: -0.5,
            ..GridConfig::default()
        };
        let params = LaunchParams::new(SessionMode::Dual, None);
        let mut session = GridSession::start("s1", params, &config, MemoryStore::new());
        assert_eq!(session.registry().active_count(), 2);

        assert!(session.begin_drag(Axis::Column, 0));
        session.drag_move(2.0);
        assert!(session.end_drag());
        assert!(session.ratios().cols().iter().all(|r| *r > 0.0));
        assert!((session.ratios().cols()[1] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_close_repacks_and_persists() {
        let mut session = start(quad(), MemoryStore::new());
        assert!(session.close_pane(2, Some(PackDirection::Horizontal)));
        assert_eq!(session.packing(), PackingMode::AxisPacked(PackDirection::Horizontal));
        assert_eq!(session.plan().span_of(3), Some(CellSpan::new(2, 1, 1, 2)));

        let stored = session.store().state().tab_state("s1").cloned().unwrap();
        assert_eq!(stored["activePaneIndices"], json!([0, 1, 3]));
        assert_eq!(stored["packByAxis"], json!(true));
    }

    #[test]
    fn test_invalid_close_changes_nothing() {
        let mut session = start(LaunchParams::new(SessionMode::Quad, Some(1)), MemoryStore::new());
        let before = session.snapshot();
        assert!(!session.close_pane(0, None));
        assert!(!session.close_pane(7, None));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_drag_persists_only_on_end() {
        let mut session = start(LaunchParams::new(SessionMode::Dual, None), MemoryStore::new());
        assert!(session.begin_drag(Axis::Column, 0));
        assert!(!session.begin_drag(Axis::Column, 0));
        session.drag_move(0.7);

        let stored = session.store().state().tab_state("s1").cloned().unwrap();
        assert_eq!(stored["grid"]["colRatios"], json!([0.5, 0.5]));

        assert!(session.end_drag());
        let stored = session.store().state().tab_state("s1").cloned().unwrap();
        let first = stored["grid"]["colRatios"][0].as_f64().unwrap();
        assert!((first - 0.7).abs() < 1e-9);
        assert!(!session.end_drag());
    }

    #[test]
    fn test_pending_state_is_cleared_even_when_rejected() {
        let mut store = MemoryStore::new();
        store
            .state_mut()
            .set_pending_layout_state(Some(json!({ "mode": "dual", "count": 2 })));
        let session = start(quad(), store);
        assert_eq!(session.plan().shape, GridShape::new(2, 2));
        assert!(session.store().state().pending_layout_state().is_none());
    }

    #[test]
    fn test_reload_restores_own_snapshot() {
        let mut session = start(quad(), MemoryStore::new());
        session.close_pane(0, Some(PackDirection::Vertical));
        session.begin_drag(Axis::Column, 0);
        session.drag_move(0.3);
        session.end_drag();
        let expected = session.snapshot();

        let store = session.store().clone();
        let reloaded = start(quad(), store);
        assert_eq!(reloaded.snapshot(), expected);
    }

    #[test]
    fn test_reset_request_handled_once() {
        let mut session = start(LaunchParams::new(SessionMode::Dual, None), MemoryStore::new());
        session.begin_drag(Axis::Column, 0);
        session.drag_move(0.75);
        session.end_drag();

        session.store_mut().state_mut().set_reset_request(&ResetRequest {
            session_id: "other".to_string(),
            token: 1,
        });
        assert!(!session.poll_reset_request());

        session.store_mut().state_mut().set_reset_request(&ResetRequest {
            session_id: "s1".to_string(),
            token: 2,
        });
        assert!(session.poll_reset_request());
        assert_eq!(session.ratios().cols(), &[0.5, 0.5]);
        assert!(!session.poll_reset_request());
    }

    #[test]
    fn test_reset_request_present_at_start_is_ignored() {
        let mut store = MemoryStore::new();
        store.state_mut().set_reset_request(&ResetRequest {
            session_id: "s1".to_string(),
            token: 9,
        });
        let mut session = start(quad(), store);
        assert!(!session.poll_reset_request());
    }

    #[test]
    fn test_navigation_updates_split_urls() {
        let mut store = MemoryStore::new();
        store
            .state_mut()
            .set_split_urls(vec!["https://a.com".to_string(), "https://b.com".to_string()]);
        let mut session = start(LaunchParams::new(SessionMode::Dual, None), store);

        assert_eq!(
            session.navigate(1, "example.org").as_deref(),
            Some("https://example.org")
        );
        assert_eq!(
            session.store().state().split_urls(),
            &["https://a.com", "https://example.org"]
        );
        assert_eq!(session.go_back(1).as_deref(), Some("https://b.com"));
        assert_eq!(session.go_back(1), None);
        assert_eq!(session.navigate(5, "x.com"), None);
    }

    #[test]
    fn test_end_records_last_session() {
        let mut session = start(quad(), MemoryStore::new());
        session.close_pane(1, None);
        let expected = session.snapshot();

        let store = session.end();
        assert!(store.state().tab_state("s1").is_none());
        let last = store.state().last_session().unwrap();
        assert_eq!(last.snapshot, expected);
        assert!(last.closed_at > 0);
    }

    #[test]
    fn test_new_session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
