//! # Grid layout vocabulary for Splitgrid Core
//!
//! This module defines the value types every other part of the engine speaks:
//! session modes and launch parameters, grid shapes, cells and cell spans,
//! resize axes and the packing mode that records how the grid closes ranks
//! after a pane is removed.
//!
//! All coordinates are 1-based. A [`CellSpan`] covers the half-open ranges
//! `[row, row + row_span)` and `[col, col + col_span)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::form_urlencoded;

/// Hard upper bound on the number of panes in one session.
pub const MAX_PANES: usize = 16;

/// Stable identity of a pane within its session.
pub type PaneIndex = usize;

/// The launch mode of a session.
///
/// `Quad` and `Dual` carry an implicit pane count (4 and 2) and, when no
/// explicit count is given, fixed 2×2 and 2×1 grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Quad,
    Dual,
}

impl SessionMode {
    /// Parse a mode name. Unknown names yield `None`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::layout::SessionMode;
    ///
    /// assert_eq!(SessionMode::parse("dual"), Some(SessionMode::Dual));
    /// assert_eq!(SessionMode::parse("hex"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "quad" => Some(Self::Quad),
            "dual" => Some(Self::Dual),
            _ => None,
        }
    }

    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quad => "quad",
            Self::Dual => "dual",
        }
    }

    /// Pane count implied by the mode when no explicit count is given.
    pub fn default_count(&self) -> usize {
        match self {
            Self::Quad => 4,
            Self::Dual => 2,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters a session is started with.
///
/// These mirror the host's query string: `mode` (default `quad`) and an
/// optional `count`. A valid count overrides the mode's implicit count and
/// disables the mode's fixed grid shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaunchParams {
    /// Session mode
    pub mode: SessionMode,
    /// Explicit pane count, already capped at [`MAX_PANES`]
    pub count: Option<usize>,
}

impl LaunchParams {
    /// Build launch parameters, dropping a zero count and capping the rest.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::layout::{LaunchParams, SessionMode};
    ///
    /// let params = LaunchParams::new(SessionMode::Quad, Some(40));
    /// assert_eq!(params.requested_count(), 16);
    /// ```
    pub fn new(mode: SessionMode, count: Option<usize>) -> Self {
        Self {
            mode,
            count: count.filter(|c| *c >= 1).map(|c| c.min(MAX_PANES)),
        }
    }

    /// Parse a query string such as `mode=dual&count=3`.
    ///
    /// A leading `?` is accepted. Unknown modes fall back to `quad` and an
    /// unparsable count is ignored.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::layout::{LaunchParams, SessionMode};
    ///
    /// let params = LaunchParams::from_query("?mode=dual&count=6");
    /// assert_eq!(params.mode, SessionMode::Dual);
    /// assert_eq!(params.requested_count(), 6);
    /// assert!(params.has_custom_count());
    /// ```
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut mode = None;
        let mut count = None;

        // First occurrence of a key wins
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "mode" if mode.is_none() => mode = Some(value.into_owned()),
                "count" if count.is_none() => count = Some(value.into_owned()),
                _ => {}
            }
        }

        let mode = mode
            .and_then(|m| SessionMode::parse(&m))
            .unwrap_or_default();
        let count = count.and_then(|c| c.trim().parse::<usize>().ok());
        Self::new(mode, count)
    }

    /// Number of panes the session asks for.
    pub fn requested_count(&self) -> usize {
        self.count.unwrap_or_else(|| self.mode.default_count())
    }

    /// Whether an explicit count was supplied.
    pub fn has_custom_count(&self) -> bool {
        self.count.is_some()
    }

    /// Render as a query string. The count is omitted when it equals the
    /// mode's implicit count.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::layout::{LaunchParams, SessionMode};
    ///
    /// assert_eq!(LaunchParams::new(SessionMode::Quad, Some(6)).to_query(), "mode=quad&count=6");
    /// assert_eq!(LaunchParams::new(SessionMode::Dual, Some(2)).to_query(), "mode=dual");
    /// ```
    pub fn to_query(&self) -> String {
        match self.count.filter(|c| *c != self.mode.default_count()) {
            Some(count) => format!("mode={}&count={}", self.mode, count),
            None => format!("mode={}", self.mode),
        }
    }
}

/// Grid dimensions as `(cols, rows)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub cols: usize,
    pub rows: usize,
}

impl GridShape {
    /// Create a shape. Both dimensions are raised to at least 1.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
        }
    }

    /// The 1×1 shape.
    pub fn single() -> Self {
        Self::new(1, 1)
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Length of the shape along an axis.
    pub fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.cols,
            Axis::Row => self.rows,
        }
    }

    /// Whether a span fits entirely inside the grid.
    pub fn contains(&self, span: &CellSpan) -> bool {
        span.row >= 1
            && span.col >= 1
            && span.row_span >= 1
            && span.col_span >= 1
            && span.row_end() <= self.rows + 1
            && span.col_end() <= self.cols + 1
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::single()
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// A single grid cell, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The coordinate along an axis (`Row` → row, `Column` → col).
    pub fn along(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.row,
            Axis::Column => self.col,
        }
    }
}

/// A rectangular run of cells occupied by one pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpan {
    pub row: usize,
    pub col: usize,
    #[serde(default = "one")]
    pub row_span: usize,
    #[serde(default = "one")]
    pub col_span: usize,
}

fn one() -> usize {
    1
}

impl CellSpan {
    pub fn new(row: usize, col: usize, row_span: usize, col_span: usize) -> Self {
        Self {
            row,
            col,
            row_span,
            col_span,
        }
    }

    /// A span covering exactly one cell.
    pub fn unit(row: usize, col: usize) -> Self {
        Self::new(row, col, 1, 1)
    }

    /// Exclusive end row.
    pub fn row_end(&self) -> usize {
        self.row + self.row_span
    }

    /// Exclusive end column.
    pub fn col_end(&self) -> usize {
        self.col + self.col_span
    }

    /// Top-left cell; this is the pane's coordinate.
    pub fn origin(&self) -> Cell {
        Cell::new(self.row, self.col)
    }

    /// `(start, end)` along an axis, end exclusive.
    pub fn range(&self, axis: Axis) -> (usize, usize) {
        match axis {
            Axis::Row => (self.row, self.row_end()),
            Axis::Column => (self.col, self.col_end()),
        }
    }

    /// Every cell covered by this span.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.row..self.row_end())
            .flat_map(move |row| (self.col..self.col_end()).map(move |col| Cell::new(row, col)))
    }
}

/// The axis a ratio vector or splitter belongs to.
///
/// A `Column` splitter is a vertical line separating two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Column,
    Row,
}

impl Axis {
    /// The other axis.
    pub fn cross(&self) -> Axis {
        match self {
            Self::Column => Self::Row,
            Self::Row => Self::Column,
        }
    }
}

/// Direction that absorbed the most recent close.
///
/// `Horizontal` packing closes ranks within rows (row-mates slide sideways);
/// `Vertical` packing closes ranks within columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackDirection {
    Horizontal,
    Vertical,
}

impl PackDirection {
    /// The axis whose coordinate identifies a group.
    pub fn group_axis(&self) -> Axis {
        match self {
            Self::Horizontal => Axis::Row,
            Self::Vertical => Axis::Column,
        }
    }

    /// The axis panes slide along inside a group.
    pub fn packed_axis(&self) -> Axis {
        match self {
            Self::Horizontal => Axis::Column,
            Self::Vertical => Axis::Row,
        }
    }
}

/// How the solver arranges panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PackingMode {
    /// Near-square row-major grid
    #[default]
    Uniform,
    /// Panes grouped by rows or columns after a close
    AxisPacked(PackDirection),
}

impl PackingMode {
    pub fn is_axis_packed(&self) -> bool {
        matches!(self, Self::AxisPacked(_))
    }

    pub fn direction(&self) -> Option<PackDirection> {
        match self {
            Self::Uniform => None,
            Self::AxisPacked(direction) => Some(*direction),
        }
    }

    /// Rebuild from the persisted `packByAxis` / `closePackDirection` pair.
    pub fn from_wire(pack_by_axis: bool, direction: Option<PackDirection>) -> Self {
        if pack_by_axis {
            Self::AxisPacked(direction.unwrap_or(PackDirection::Horizontal))
        } else {
            Self::Uniform
        }
    }
}
