//! # Packing solver
//!
//! Decides the grid shape and the cell span of every active pane.
//!
//! The solver is a pure function of its [`SolverInput`]: the ordered active
//! set, the coordinates from the previous solve, the launch parameters and
//! the packing mode. Rules, in order:
//!
//! 1. One pane (or none) gets a 1×1 grid.
//! 2. A `dual` session without an explicit count and with both panes still
//!    open gets a 2×1 grid.
//! 3. A `quad` session without an explicit count and with four panes gets 2×2.
//! 4. Axis-packed sessions group panes into tracks (rows for horizontal
//!    packing, columns for vertical) keyed by their previous coordinate, so
//!    only the track that lost a pane changes.
//! 5. Otherwise a near-square grid: `rows = floor(sqrt n)`,
//!    `cols = ceil(n / rows)`, filled row-major.
//!
//! Within a track holding `k` panes of a grid `extent` cells long, pane `i`
//! spans `[floor(i*extent/k) + 1, floor((i+1)*extent/k) + 1)`. Full tracks
//! get one cell per pane; a ragged track stretches its panes over the whole
//! extent, so one leftover pane in a 5-column grid spans all 5 columns.

use crate::layout::{
    Axis, Cell, CellSpan, GridShape, LaunchParams, PackDirection, PackingMode, PaneIndex,
    SessionMode,
};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Everything the solver looks at.
#[derive(Debug, Clone, Copy)]
pub struct SolverInput<'a> {
    /// Active panes in sequence order
    pub active: &'a [PaneIndex],
    /// Coordinates from the previous solve
    pub coordinates: &'a BTreeMap<PaneIndex, Cell>,
    /// Session launch parameters
    pub params: LaunchParams,
    /// Current packing mode
    pub packing: PackingMode,
}

/// Where one pane goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub pane: PaneIndex,
    pub span: CellSpan,
}

/// Solver output: a shape and one placement per active pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlan {
    pub shape: GridShape,
    pub placements: Vec<Placement>,
}

impl GridPlan {
    /// Span assigned to a pane.
    pub fn span_of(&self, pane: PaneIndex) -> Option<CellSpan> {
        self.placements
            .iter()
            .find(|p| p.pane == pane)
            .map(|p| p.span)
    }

    /// Top-left coordinate of every placed pane.
    pub fn coordinates(&self) -> BTreeMap<PaneIndex, Cell> {
        self.placements
            .iter()
            .map(|p| (p.pane, p.span.origin()))
            .collect()
    }

    /// Check that the plan places exactly the `active` panes and that every
    /// cell of the shape is claimed by exactly one of them.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::layout::{CellSpan, GridShape};
    /// use splitgrid_core::packing::{GridPlan, Placement};
    ///
    /// let plan = GridPlan {
    ///     shape: GridShape::new(2, 1),
    ///     placements: vec![Placement { pane: 0, span: CellSpan::unit(1, 1) }],
    /// };
    /// assert!(plan.validate(&[0]).is_err()); // cell (1,2) is a hole
    /// ```
    pub fn validate(&self, active: &[PaneIndex]) -> Result<()> {
        let placed: HashSet<PaneIndex> = self.placements.iter().map(|p| p.pane).collect();
        if placed.len() != self.placements.len() {
            return Err(Error::validation("paneLayout", "pane placed twice"));
        }
        let expected: HashSet<PaneIndex> = active.iter().copied().collect();
        if placed != expected {
            return Err(Error::validation(
                "paneLayout",
                "placements do not match active panes",
            ));
        }

        let mut claimed = vec![0u8; self.shape.cell_count()];
        for placement in &self.placements {
            if !self.shape.contains(&placement.span) {
                return Err(Error::validation(
                    "paneLayout".to_string(),
                    format!("pane {} lies outside {}", placement.pane, self.shape),
                ));
            }
            for cell in placement.span.cells() {
                let slot = &mut claimed[(cell.row - 1) * self.shape.cols + (cell.col - 1)];
                *slot = slot.saturating_add(1);
            }
        }

        if claimed.iter().any(|c| *c != 1) {
            return Err(Error::validation(
                "paneLayout",
                "cells are not covered exactly once",
            ));
        }
        Ok(())
    }
}

/// Compute the grid for the given input.
///
/// # Example
///
/// ```rust
/// use splitgrid_core::layout::{CellSpan, GridShape, LaunchParams, PackingMode, SessionMode};
/// use splitgrid_core::packing::{solve, SolverInput};
/// use std::collections::BTreeMap;
///
/// let plan = solve(&SolverInput {
///     active: &[0, 1, 2, 3, 4, 5],
///     coordinates: &BTreeMap::new(),
///     params: LaunchParams::new(SessionMode::Quad, Some(6)),
///     packing: PackingMode::Uniform,
/// });
/// assert_eq!(plan.shape, GridShape::new(3, 2));
/// assert_eq!(plan.span_of(4), Some(CellSpan::unit(2, 2)));
/// ```
pub fn solve(input: &SolverInput<'_>) -> GridPlan {
    let active = input.active;
    let n = active.len();
    let fixed_mode = !input.params.has_custom_count();

    if n <= 1 {
        return GridPlan {
            shape: GridShape::single(),
            placements: active
                .iter()
                .map(|pane| Placement {
                    pane: *pane,
                    span: CellSpan::unit(1, 1),
                })
                .collect(),
        };
    }

    if fixed_mode
        && input.params.mode == SessionMode::Dual
        && input.packing == PackingMode::Uniform
        && n == 2
    {
        return row_major(active, 2);
    }

    if fixed_mode && input.params.mode == SessionMode::Quad && n == 4 {
        return row_major(active, 2);
    }

    match input.packing {
        PackingMode::AxisPacked(direction) => axis_packed(active, input.coordinates, direction),
        PackingMode::Uniform => {
            let (cols, _rows) = near_square(n);
            row_major(active, cols)
        }
    }
}

/// `(cols, rows)` of the near-square grid for `n` panes.
pub fn near_square(n: usize) -> (usize, usize) {
    let n = n.max(1);
    let rows = ((n as f64).sqrt().floor() as usize).max(1);
    (n.div_ceil(rows), rows)
}

fn row_major(order: &[PaneIndex], cols: usize) -> GridPlan {
    let tracks: Vec<Vec<PaneIndex>> = order.chunks(cols).map(|c| c.to_vec()).collect();
    lay_out_tracks(&tracks, cols, Axis::Row)
}

fn axis_packed(
    active: &[PaneIndex],
    coordinates: &BTreeMap<PaneIndex, Cell>,
    direction: PackDirection,
) -> GridPlan {
    let fallback;
    let coordinates = if active.iter().all(|p| coordinates.contains_key(p)) {
        coordinates
    } else {
        debug!("Axis packing without full coordinates, seeding from uniform layout");
        let (cols, _) = near_square(active.len());
        fallback = row_major(active, cols).coordinates();
        &fallback
    };

    let group_axis = direction.group_axis();
    let packed_axis = direction.packed_axis();

    let mut groups: BTreeMap<usize, Vec<(usize, PaneIndex)>> = BTreeMap::new();
    for pane in active {
        let cell = coordinates[pane];
        groups
            .entry(cell.along(group_axis))
            .or_default()
            .push((cell.along(packed_axis), *pane));
    }

    let tracks: Vec<Vec<PaneIndex>> = groups
        .into_values()
        .map(|mut members| {
            members.sort_unstable();
            members.into_iter().map(|(_, pane)| pane).collect()
        })
        .collect();
    let extent = tracks.iter().map(Vec::len).max().unwrap_or(1);

    lay_out_tracks(&tracks, extent, group_axis)
}

/// Lay tracks side by side. `track_axis` is `Row` when each track is a grid
/// row and `Column` when each track is a grid column.
fn lay_out_tracks(tracks: &[Vec<PaneIndex>], extent: usize, track_axis: Axis) -> GridPlan {
    let mut placements = Vec::with_capacity(tracks.iter().map(Vec::len).sum());

    for (t, track) in tracks.iter().enumerate() {
        let k = track.len();
        for (i, pane) in track.iter().enumerate() {
            let start = i * extent / k + 1;
            let end = (i + 1) * extent / k + 1;
            let span = match track_axis {
                Axis::Row => CellSpan::new(t + 1, start, 1, end - start),
                Axis::Column => CellSpan::new(start, t + 1, end - start, 1),
            };
            placements.push(Placement { pane: *pane, span });
        }
    }

    let shape = match track_axis {
        Axis::Row => GridShape::new(extent, tracks.len()),
        Axis::Column => GridShape::new(tracks.len(), extent),
    };
    GridPlan { shape, placements }
}
