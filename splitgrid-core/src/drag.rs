//! Splitter drag handling.
//!
//! A drag is an explicit state machine:
//!
//! ```text
//! Idle --begin--> Dragging --end--> Idle
//!                    |  ^
//!                    move
//! ```
//!
//! `begin` captures which pair of adjacent ratio entries the splitter
//! separates. Each `move` reports the pointer's position normalized to the
//! grid (`0.0` = left/top edge, `1.0` = right/bottom edge) and rewrites only
//! that pair. `move` while idle and `begin` while dragging are rejected.

use crate::layout::Axis;
use crate::ratio::RatioModel;
use crate::{rejected, Result};

/// Default ceiling for the minimum size of either side of a dragged pair.
pub const DEFAULT_MIN_FRACTION: f64 = 0.2;

/// Current drag state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        axis: Axis,
        /// Index of the entry left of (or above) the splitter
        boundary: usize,
    },
}

/// What a `move` event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEffect {
    /// The pair was rewritten to these sizes.
    Resized { first: f64, second: f64 },
    /// Nothing happened.
    Noop(DragNoopReason),
}

/// Why a `move` event was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragNoopReason {
    IdleWithoutActiveDrag,
    NonFinitePosition,
    StaleBoundary,
}

/// Idle/Dragging state machine over a [`RatioModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct DragController {
    state: DragState,
    min_fraction: f64,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FRACTION)
    }
}

impl DragController {
    /// Create a controller whose minimum side size is
    /// `min(min_fraction, pair / 4)`.
    ///
    /// A fraction outside `(0, 0.5]` would let a drag produce empty or
    /// negative tracks, so it is replaced by [`DEFAULT_MIN_FRACTION`].
    pub fn new(min_fraction: f64) -> Self {
        let min_fraction = if Self::accepts_min_fraction(min_fraction) {
            min_fraction
        } else {
            tracing::debug!("Ignoring drag minimum fraction {}", min_fraction);
            DEFAULT_MIN_FRACTION
        };
        Self {
            state: DragState::Idle,
            min_fraction,
        }
    }

    /// Whether `min_fraction` is usable as a minimum side size.
    pub fn accepts_min_fraction(min_fraction: f64) -> bool {
        min_fraction.is_finite() && min_fraction > 0.0 && min_fraction <= 0.5
    }

    pub fn min_fraction(&self) -> f64 {
        self.min_fraction
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Start dragging the splitter after entry `boundary` on `axis`.
    ///
    /// Rejected when a drag is already active or when the splitter does not
    /// exist in `ratios` (it needs an entry on each side).
    pub fn begin(&mut self, axis: Axis, boundary: usize, ratios: &RatioModel) -> Result<()> {
        if let DragState::Dragging { axis: a, boundary: b } = self.state {
            return Err(rejected!("drag already active on {:?} boundary {}", a, b));
        }
        if boundary + 1 >= ratios.axis(axis).len() {
            return Err(rejected!("no {:?} boundary {}", axis, boundary));
        }
        self.state = DragState::Dragging { axis, boundary };
        Ok(())
    }

    /// Apply a pointer position to the active pair.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::drag::{DragController, DragEffect};
    /// use splitgrid_core::layout::{Axis, GridShape};
    /// use splitgrid_core::ratio::RatioModel;
    ///
    /// let mut ratios = RatioModel::new(GridShape::new(2, 1));
    /// let mut drag = DragController::default();
    /// drag.begin(Axis::Column, 0, &ratios)?;
    /// drag.move_to(0.99, &mut ratios);
    /// assert!((ratios.cols()[0] - 0.8).abs() < 1e-9);
    /// assert!((ratios.cols()[1] - 0.2).abs() < 1e-9);
    /// # Ok::<(), splitgrid_core::Error>(())
    /// ```
    pub fn move_to(&mut self, position: f64, ratios: &mut RatioModel) -> DragEffect {
        let DragState::Dragging { axis, boundary } = self.state else {
            return DragEffect::Noop(DragNoopReason::IdleWithoutActiveDrag);
        };
        if !position.is_finite() {
            return DragEffect::Noop(DragNoopReason::NonFinitePosition);
        }

        let values = ratios.axis_mut(axis);
        if boundary + 1 >= values.len() {
            return DragEffect::Noop(DragNoopReason::StaleBoundary);
        }

        let position = position.clamp(0.0, 1.0);
        let prefix: f64 = values[..boundary].iter().sum();
        let pair = values[boundary] + values[boundary + 1];
        let min_size = self.min_fraction.min(pair / 4.0);

        let first = (position - prefix).clamp(min_size, pair - min_size);
        let second = pair - first;
        values[boundary] = first;
        values[boundary + 1] = second;

        DragEffect::Resized { first, second }
    }

    /// Finish the drag. Returns `true` when a drag was active, meaning the
    /// layout should be snapshotted.
    pub fn end(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.state = DragState::Idle;
        was_dragging
    }

    /// Drop any active drag without reporting it.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::GridShape;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_two_column_drag_and_clamp() {
        let mut ratios = RatioModel::new(GridShape::new(2, 1));
        let mut drag = DragController::default();
        drag.begin(Axis::Column, 0, &ratios).unwrap();

        drag.move_to(0.8, &mut ratios);
        assert!(approx(ratios.cols()[0], 0.8) && approx(ratios.cols()[1], 0.2));

        drag.move_to(0.99, &mut ratios);
        assert!(approx(ratios.cols()[0], 0.8) && approx(ratios.cols()[1], 0.2));

        drag.move_to(0.0, &mut ratios);
        assert!(approx(ratios.cols()[0], 0.2));
        assert!(drag.end());
        assert!(!drag.end());
    }

    #[test]
    fn test_small_pair_uses_quarter_minimum() {
        let mut ratios = RatioModel::new(GridShape::new(5, 1));
        let mut drag = DragController::default();
        drag.begin(Axis::Column, 2, &ratios).unwrap();

        // Pair is 0.4 wide starting at 0.4: min side is 0.1.
        drag.move_to(0.0, &mut ratios);
        assert!(approx(ratios.cols()[2], 0.1));
        assert!(approx(ratios.cols()[3], 0.3));
        let total: f64 = ratios.cols().iter().sum();
        assert!(approx(total, 1.0));
        assert!(approx(ratios.cols()[0], 0.2) && approx(ratios.cols()[4], 0.2));
    }

    #[test]
    fn test_rejections() {
        let mut ratios = RatioModel::new(GridShape::new(2, 2));
        let mut drag = DragController::default();

        assert_eq!(
            drag.move_to(0.3, &mut ratios),
            DragEffect::Noop(DragNoopReason::IdleWithoutActiveDrag)
        );
        assert!(drag.begin(Axis::Column, 1, &ratios).is_err());

        drag.begin(Axis::Row, 0, &ratios).unwrap();
        assert!(drag.begin(Axis::Column, 0, &ratios).is_err());
        assert_eq!(drag.state(), DragState::Dragging { axis: Axis::Row, boundary: 0 });

        assert_eq!(
            drag.move_to(f64::NAN, &mut ratios),
            DragEffect::Noop(DragNoopReason::NonFinitePosition)
        );
        assert!(approx(ratios.rows()[0], 0.5));
    }

    #[test]
    fn test_invalid_min_fraction_keeps_tracks_positive() {
        for bad in [-0.3, 0.0, 0.9, f64::NAN] {
            let drag = DragController::new(bad);
            assert!(approx(drag.min_fraction(), DEFAULT_MIN_FRACTION));
        }

        let mut ratios = RatioModel::new(GridShape::new(2, 1));
        let mut drag = DragController::new(-0.3);
        drag.begin(Axis::Column, 0, &ratios).unwrap();
        drag.move_to(1.5, &mut ratios);
        assert!(ratios.cols().iter().all(|r| *r > 0.0));
        assert!(approx(ratios.cols()[1], DEFAULT_MIN_FRACTION));
    }
}
