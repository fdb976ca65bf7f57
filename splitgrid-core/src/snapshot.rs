//! # Layout snapshots
//!
//! A [`Snapshot`] is the persisted form of a session's layout. It is written
//! after every structural change and read back when a session starts.
//!
//! Persisted records outlive the code that wrote them, so every field of an
//! incoming snapshot is optional and untrusted. [`Snapshot::validate`] checks
//! the record against the session it is being applied to and either yields a
//! complete [`RestoredLayout`] or rejects the record as a whole; there is no
//! partial restore.
//!
//! The wire format uses camelCase keys:
//!
//! ```json
//! {
//!   "mode": "quad",
//!   "count": 4,
//!   "activePaneIndices": [0, 1, 3],
//!   "closePackDirection": "horizontal",
//!   "packByAxis": true,
//!   "grid": { "cols": 2, "rows": 2, "colRatios": [0.5, 0.5], "rowRatios": [0.5, 0.5] },
//!   "paneLayout": { "0": { "row": 1, "col": 1, "rowSpan": 1, "colSpan": 1 } },
//!   "urls": ["https://example.com"]
//! }
//! ```

use crate::layout::{
    Cell, CellSpan, GridShape, LaunchParams, PackDirection, PackingMode, PaneIndex, MAX_PANES,
};
use crate::packing::{GridPlan, Placement};
use crate::ratio::{normalize_ratios, RatioModel};
use crate::registry::PaneRegistry;
use crate::{restore_error, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Persisted grid dimensions and ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRecord {
    pub cols: i64,
    pub rows: i64,
    #[serde(default)]
    pub col_ratios: Vec<f64>,
    #[serde(default)]
    pub row_ratios: Vec<f64>,
}

/// Persisted cell span of one pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneCellRecord {
    pub row: i64,
    pub col: i64,
    #[serde(default = "one")]
    pub row_span: i64,
    #[serde(default = "one")]
    pub col_span: i64,
}

fn one() -> i64 {
    1
}

impl From<CellSpan> for PaneCellRecord {
    fn from(span: CellSpan) -> Self {
        Self {
            row: span.row as i64,
            col: span.col as i64,
            row_span: span.row_span as i64,
            col_span: span.col_span as i64,
        }
    }
}

impl PaneCellRecord {
    fn to_span(self) -> Option<CellSpan> {
        let convert = |v: i64| usize::try_from(v).ok().filter(|v| (1..=MAX_PANES).contains(v));
        Some(CellSpan::new(
            convert(self.row)?,
            convert(self.col)?,
            convert(self.row_span)?,
            convert(self.col_span)?,
        ))
    }
}

/// Serializable layout record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub active_pane_indices: Option<Vec<i64>>,
    #[serde(default)]
    pub close_pack_direction: Option<PackDirection>,
    #[serde(default)]
    pub pack_by_axis: bool,
    #[serde(default)]
    pub grid: Option<GridRecord>,
    #[serde(default)]
    pub pane_layout: BTreeMap<String, PaneCellRecord>,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// A grid restored verbatim from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredGrid {
    pub plan: GridPlan,
    pub col_ratios: Vec<f64>,
    pub row_ratios: Vec<f64>,
}

/// A validated snapshot, ready to be applied in one step.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredLayout {
    pub active: Vec<PaneIndex>,
    pub coordinates: BTreeMap<PaneIndex, Cell>,
    pub packing: PackingMode,
    /// Present when the snapshot carried a grid shape; the solver is skipped.
    pub grid: Option<RestoredGrid>,
}

impl Snapshot {
    /// Build the record for the current engine state. Pure.
    pub fn capture(
        params: LaunchParams,
        registry: &PaneRegistry,
        plan: &GridPlan,
        ratios: &RatioModel,
        packing: PackingMode,
        urls: &[String],
    ) -> Self {
        Self {
            mode: Some(params.mode.as_str().to_string()),
            count: Some(params.requested_count() as i64),
            active_pane_indices: Some(registry.active().iter().map(|i| *i as i64).collect()),
            close_pack_direction: packing.direction(),
            pack_by_axis: packing.is_axis_packed(),
            grid: Some(GridRecord {
                cols: plan.shape.cols as i64,
                rows: plan.shape.rows as i64,
                col_ratios: ratios.cols().to_vec(),
                row_ratios: ratios.rows().to_vec(),
            }),
            pane_layout: plan
                .placements
                .iter()
                .map(|p| (p.pane.to_string(), PaneCellRecord::from(p.span)))
                .collect(),
            urls: urls.to_vec(),
        }
    }

    /// Parse an untrusted JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| restore_error!("malformed snapshot: {}", e))
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    /// Packing mode recorded in the snapshot.
    pub fn packing(&self) -> PackingMode {
        PackingMode::from_wire(self.pack_by_axis, self.close_pack_direction)
    }

    /// Validate the snapshot against the session it is being applied to.
    ///
    /// Checks, in order: mode, pane count, active indices (non-empty, below
    /// `capacity`, unique), and when a grid is stored, ratio normalization
    /// plus exact cell coverage by the active panes.
    pub fn validate(&self, params: LaunchParams, capacity: usize) -> Result<RestoredLayout> {
        let expected_mode = params.mode.as_str();
        match self.mode.as_deref() {
            Some(mode) if mode == expected_mode => {}
            other => {
                return Err(restore_error!(
                    "mode {:?} does not match session mode {}",
                    other,
                    expected_mode
                ))
            }
        }

        let expected_count = params.requested_count() as i64;
        if self.count != Some(expected_count) {
            return Err(restore_error!(
                "count {:?} does not match session count {}",
                self.count,
                expected_count
            ));
        }

        let raw_active = self
            .active_pane_indices
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| restore_error!("no active panes"))?;
        let limit = capacity.min(expected_count as usize);
        let mut seen = HashSet::new();
        let mut active = Vec::with_capacity(raw_active.len());
        for raw in raw_active {
            let index = usize::try_from(*raw)
                .ok()
                .filter(|i| *i < limit)
                .ok_or_else(|| restore_error!("pane index {} out of range 0..{}", raw, limit))?;
            if !seen.insert(index) {
                return Err(restore_error!("pane index {} listed twice", index));
            }
            active.push(index);
        }

        let mut spans = BTreeMap::new();
        for (key, record) in &self.pane_layout {
            let index: PaneIndex = key
                .parse()
                .map_err(|_| restore_error!("bad pane layout key {:?}", key))?;
            if !seen.contains(&index) {
                continue;
            }
            let span = record
                .to_span()
                .ok_or_else(|| restore_error!("bad cell for pane {}: {:?}", index, record))?;
            spans.insert(index, span);
        }

        let grid = match &self.grid {
            None => None,
            Some(record) => Some(validate_grid(record, &active, &spans)?),
        };

        Ok(RestoredLayout {
            coordinates: spans.iter().map(|(i, s)| (*i, s.origin())).collect(),
            active,
            packing: self.packing(),
            grid,
        })
    }
}

fn validate_grid(
    record: &GridRecord,
    active: &[PaneIndex],
    spans: &BTreeMap<PaneIndex, CellSpan>,
) -> Result<RestoredGrid> {
    let dimension = |v: i64, name: &str| {
        usize::try_from(v)
            .ok()
            .filter(|v| (1..=MAX_PANES).contains(v))
            .ok_or_else(|| restore_error!("grid {} {} out of range", name, v))
    };
    let shape = GridShape::new(dimension(record.cols, "cols")?, dimension(record.rows, "rows")?);

    let col_ratios = normalize_ratios(&record.col_ratios, shape.cols)
        .ok_or_else(|| restore_error!("colRatios do not fit {} columns", shape.cols))?;
    let row_ratios = normalize_ratios(&record.row_ratios, shape.rows)
        .ok_or_else(|| restore_error!("rowRatios do not fit {} rows", shape.rows))?;

    let placements = active
        .iter()
        .map(|pane| {
            spans
                .get(pane)
                .map(|span| Placement {
                    pane: *pane,
                    span: *span,
                })
                .ok_or_else(|| restore_error!("pane {} has no stored cell", pane))
        })
        .collect::<Result<Vec<_>>>()?;

    let plan = GridPlan { shape, placements };
    plan.validate(active)
        .map_err(|e| restore_error!("stored grid is inconsistent: {}", e))?;

    Ok(RestoredGrid {
        plan,
        col_ratios,
        row_ratios,
    })
}
