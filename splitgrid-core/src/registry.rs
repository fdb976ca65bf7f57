//! The set of panes in a session and their last known grid coordinates.

use crate::layout::{Cell, PackDirection, PaneIndex};
use crate::navigation::NavigationHistory;
use crate::{rejected, Result};
use std::collections::BTreeMap;

/// One pane slot. Slots exist for every index the session was created with;
/// closed panes stay in the table as inactive slots and are never reused.
#[derive(Debug, Clone, PartialEq)]
pub struct Pane {
    index: PaneIndex,
    active: bool,
    coordinate: Option<Cell>,
    history: NavigationHistory,
}

impl Pane {
    fn new(index: PaneIndex) -> Self {
        Self {
            index,
            active: true,
            coordinate: None,
            history: NavigationHistory::new(),
        }
    }

    pub fn index(&self) -> PaneIndex {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Top-left cell assigned by the last solve.
    pub fn coordinate(&self) -> Option<Cell> {
        self.coordinate
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut NavigationHistory {
        &mut self.history
    }
}

/// Registry of the panes of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneRegistry {
    panes: Vec<Pane>,
    /// Active indices in sequence order
    active: Vec<PaneIndex>,
}

impl PaneRegistry {
    /// Create a registry with panes `0..n`, `n = min(capped_at, max(1, requested))`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::registry::PaneRegistry;
    ///
    /// let registry = PaneRegistry::create_session(0, 16);
    /// assert_eq!(registry.active(), &[0]);
    ///
    /// let registry = PaneRegistry::create_session(40, 16);
    /// assert_eq!(registry.active_count(), 16);
    /// ```
    pub fn create_session(requested: usize, capped_at: usize) -> Self {
        let n = requested.max(1).min(capped_at.max(1));
        Self {
            panes: (0..n).map(Pane::new).collect(),
            active: (0..n).collect(),
        }
    }

    /// Number of pane slots, active or not.
    pub fn capacity(&self) -> usize {
        self.panes.len()
    }

    pub fn active(&self) -> &[PaneIndex] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, index: PaneIndex) -> bool {
        self.panes.get(index).is_some_and(|p| p.active)
    }

    pub fn pane(&self, index: PaneIndex) -> Option<&Pane> {
        self.panes.get(index)
    }

    pub fn pane_mut(&mut self, index: PaneIndex) -> Option<&mut Pane> {
        self.panes.get_mut(index)
    }

    /// Active panes in sequence order.
    pub fn active_panes(&self) -> impl Iterator<Item = &Pane> {
        self.active.iter().filter_map(|i| self.panes.get(*i))
    }

    pub fn coordinate(&self, index: PaneIndex) -> Option<Cell> {
        self.panes.get(index).and_then(|p| p.coordinate)
    }

    /// Coordinates of all active panes that have one.
    pub fn coordinates(&self) -> BTreeMap<PaneIndex, Cell> {
        self.active_panes()
            .filter_map(|p| p.coordinate.map(|c| (p.index, c)))
            .collect()
    }

    /// Close an active pane.
    ///
    /// Fails when the pane is not active or is the last one left. On success
    /// the pane's coordinate and history are cleared and the direction the
    /// grid should pack in is returned: `direction` when given, otherwise
    /// inferred from the pane's neighbours (row-mates first, then
    /// column-mates).
    pub fn close(
        &mut self,
        index: PaneIndex,
        direction: Option<PackDirection>,
    ) -> Result<PackDirection> {
        if !self.is_active(index) {
            return Err(rejected!("pane {} is not active", index));
        }
        if self.active.len() <= 1 {
            return Err(rejected!("pane {} is the last remaining pane", index));
        }

        let direction = direction.unwrap_or_else(|| self.infer_direction(index));

        self.active.retain(|i| *i != index);
        let pane = &mut self.panes[index];
        pane.active = false;
        pane.coordinate = None;
        pane.history.clear();

        Ok(direction)
    }

    fn infer_direction(&self, index: PaneIndex) -> PackDirection {
        let Some(cell) = self.coordinate(index) else {
            return PackDirection::Horizontal;
        };
        let others: Vec<Cell> = self
            .active_panes()
            .filter(|p| p.index != index)
            .filter_map(|p| p.coordinate)
            .collect();

        if others.iter().any(|c| c.row == cell.row) {
            PackDirection::Horizontal
        } else if others.iter().any(|c| c.col == cell.col) {
            PackDirection::Vertical
        } else {
            PackDirection::Horizontal
        }
    }

    pub(crate) fn set_coordinate(&mut self, index: PaneIndex, cell: Cell) {
        if let Some(pane) = self.panes.get_mut(index) {
            pane.coordinate = Some(cell);
        }
    }

    /// Replace the active set and coordinates wholesale.
    ///
    /// Callers validate `active` beforehand: every index below
    /// [`capacity`](Self::capacity), no duplicates, non-empty.
    pub(crate) fn replace(&mut self, active: &[PaneIndex], coordinates: &BTreeMap<PaneIndex, Cell>) {
        for pane in &mut self.panes {
            let keep = active.contains(&pane.index);
            pane.active = keep;
            pane.coordinate = if keep {
                coordinates.get(&pane.index).copied()
            } else {
                None
            };
            if !keep {
                pane.history.clear();
            }
        }
        self.active = active.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_bounds() {
        assert_eq!(PaneRegistry::create_session(4, 16).active(), &[0, 1, 2, 3]);
        assert_eq!(PaneRegistry::create_session(9, 6).capacity(), 6);
        assert_eq!(PaneRegistry::create_session(3, 0).active_count(), 1);
    }

    #[test]
    fn test_close_rules() {
        let mut registry = PaneRegistry::create_session(2, 16);
        assert!(registry.close(5, None).unwrap_err().is_rejected());

        registry.close(0, Some(PackDirection::Vertical)).unwrap();
        assert!(!registry.is_active(0));
        assert_eq!(registry.active(), &[1]);

        // Closed pane cannot be closed again, last pane cannot be closed.
        assert!(registry.close(0, None).is_err());
        assert!(registry.close(1, None).is_err());
        assert_eq!(registry.active(), &[1]);
    }

    #[test]
    fn test_close_clears_pane_state() {
        let mut registry = PaneRegistry::create_session(3, 16);
        registry.set_coordinate(1, Cell::new(1, 2));
        registry
            .pane_mut(1)
            .unwrap()
            .history_mut()
            .navigate("https://a.com");

        registry.close(1, None).unwrap();
        let pane = registry.pane(1).unwrap();
        assert_eq!(pane.coordinate(), None);
        assert_eq!(pane.history(), &NavigationHistory::new());
    }

    #[test]
    fn test_direction_inference() {
        let mut registry = PaneRegistry::create_session(4, 16);
        registry.set_coordinate(0, Cell::new(1, 1));
        registry.set_coordinate(1, Cell::new(1, 2));
        registry.set_coordinate(2, Cell::new(2, 1));
        registry.set_coordinate(3, Cell::new(2, 2));
        assert_eq!(registry.close(2, None).unwrap(), PackDirection::Horizontal);

        // Pane 3 is now alone in row 2 but shares column 2 with pane 1.
        assert_eq!(registry.close(3, None).unwrap(), PackDirection::Vertical);
    }
}
