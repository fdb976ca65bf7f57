//! Main application structure for Splitgrid.
//!
//! This module implements `eframe::App` on top of a [`GridSession`]. The
//! session decides where every pane goes; this module only turns the
//! current plan and ratios into rectangles and forwards pointer and
//! keyboard input back to the session.

use crate::AppArgs;
use eframe::egui;
use splitgrid_core::layout::{Axis, CellSpan, PaneIndex};
use splitgrid_core::navigation::BLANK_ADDRESS;
use splitgrid_core::session::new_session_id;
use splitgrid_core::{Config, FileStore, GridPlan, GridSession, RatioModel};
use std::ops::Range;
use std::time::{Duration, Instant};

/// How often the shared state is checked for a reset request.
const RESET_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Thickness of the grab area around a splitter, in points.
const SPLITTER_GRAB: f32 = 6.0;

/// Something the user asked a pane to do this frame.
#[derive(Debug, Clone, PartialEq)]
enum PaneAction {
    Navigate(usize, String),
    Back(usize),
    Close(usize),
}

/// Main Splitgrid application state
pub struct Splitgrid {
    /// Engine session; taken on exit
    session: Option<GridSession<FileStore>>,
    /// Address field contents, index aligned with pane slots
    address_inputs: Vec<String>,
    /// Last time the reset request was polled
    last_reset_poll: Instant,
}

impl Splitgrid {
    /// Create the application and start (or resume) the session.
    pub fn new(args: &AppArgs, config: &Config) -> Self {
        let session_id = args.session.clone().unwrap_or_else(new_session_id);
        let params = args.launch_params(config);
        let store = FileStore::new(&config.storage.state_file);
        tracing::info!(
            "Using state file {}",
            config.storage.state_file.display()
        );

        let session = GridSession::start(session_id, params, &config.grid, store);
        let address_inputs = address_inputs(&session.urls());

        Self {
            session: Some(session),
            address_inputs,
            last_reset_poll: Instant::now(),
        }
    }

    fn apply(&mut self, action: PaneAction) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match action {
            PaneAction::Navigate(index, input) => {
                if let Some(address) = session.navigate(index, &input) {
                    self.address_inputs[index] = display_address(&address);
                }
            }
            PaneAction::Back(index) => {
                if let Some(address) = session.go_back(index) {
                    self.address_inputs[index] = display_address(&address);
                }
            }
            PaneAction::Close(index) => {
                if session.close_pane(index, None) {
                    self.address_inputs[index].clear();
                }
            }
        }
    }

    fn poll_reset(&mut self) {
        if self.last_reset_poll.elapsed() < RESET_POLL_INTERVAL {
            return;
        }
        self.last_reset_poll = Instant::now();
        if let Some(session) = self.session.as_mut() {
            session.poll_reset_request();
        }
    }

    /// Render the status bar.
    fn render_status_bar(&self, ctx: &egui::Context) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!(
                    "{} · {} panes · {}",
                    session.plan().shape,
                    session.registry().active_count(),
                    match session.packing().direction() {
                        Some(direction) => format!("packed {:?}", direction).to_lowercase(),
                        None => "uniform".to_string(),
                    }
                ));
                ui.separator();
                ui.label(format!("Session {}", session.session_id()));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Splitgrid v{}", env!("CARGO_PKG_VERSION")));
                });
            });
        });
    }

    /// Render the grid: panes first, then splitters on top.
    fn render_grid(&mut self, ctx: &egui::Context) {
        let mut actions = Vec::new();

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            let grid = ui.available_rect_before_wrap();
            let can_close = session.registry().active_count() > 1;

            for placement in session.plan().placements.clone() {
                let rect = pane_rect(grid, session.ratios(), placement.span).shrink(2.0);
                let index = placement.pane;
                let can_go_back = session
                    .registry()
                    .pane(index)
                    .is_some_and(|p| p.history().can_go_back());
                let input = &mut self.address_inputs[index];

                ui.scope_builder(egui::UiBuilder::new().max_rect(rect), |ui| {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_min_size(ui.available_size());
                        render_pane(ui, index, input, can_go_back, can_close, &mut actions);
                    });
                });
            }

            render_splitters(ui, grid, session);
        });

        for action in actions {
            self.apply(action);
        }
    }
}

fn render_pane(
    ui: &mut egui::Ui,
    index: usize,
    input: &mut String,
    can_go_back: bool,
    can_close: bool,
    actions: &mut Vec<PaneAction>,
) {
    ui.horizontal(|ui| {
        if ui
            .add_enabled(can_go_back, egui::Button::new("←"))
            .on_hover_text("Back")
            .clicked()
        {
            actions.push(PaneAction::Back(index));
        }

        let close = ui
            .with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let close = ui
                    .add_enabled(can_close, egui::Button::new("✕"))
                    .on_hover_text("Close pane")
                    .clicked();
                let response = ui.add(
                    egui::TextEdit::singleline(input)
                        .hint_text("Search or enter address")
                        .desired_width(f32::INFINITY),
                );
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    actions.push(PaneAction::Navigate(index, input.clone()));
                }
                close
            })
            .inner;
        if close {
            actions.push(PaneAction::Close(index));
        }
    });

    ui.separator();
    ui.centered_and_justified(|ui| {
        if input.is_empty() {
            ui.weak(format!("Pane {}", index + 1));
        } else {
            ui.label(input.as_str());
        }
    });
}

/// Draw the column and row splitters and forward drags to the session.
///
/// A boundary is only drawn and grabbable where it separates two different
/// panes; a pane spanning several tracks hides the boundaries inside it.
fn render_splitters(ui: &mut egui::Ui, grid: egui::Rect, session: &mut GridSession<FileStore>) {
    let stroke = ui.visuals().widgets.noninteractive.bg_stroke;

    for axis in [Axis::Column, Axis::Row] {
        let offsets = session.ratios().boundaries(axis);
        for (boundary, offset) in offsets.into_iter().enumerate() {
            for segment in splitter_segments(session.plan(), axis, boundary) {
                let (start, size) =
                    session
                        .ratios()
                        .span_fraction(axis.cross(), segment.start, segment.end);
                let (line, grab, cursor) = match axis {
                    Axis::Column => {
                        let x = grid.left() + grid.width() * offset as f32;
                        let top = grid.top() + grid.height() * start as f32;
                        let bottom = top + grid.height() * size as f32;
                        (
                            [egui::pos2(x, top), egui::pos2(x, bottom)],
                            egui::Rect::from_x_y_ranges(
                                (x - SPLITTER_GRAB)..=(x + SPLITTER_GRAB),
                                top..=bottom,
                            ),
                            egui::CursorIcon::ResizeHorizontal,
                        )
                    }
                    Axis::Row => {
                        let y = grid.top() + grid.height() * offset as f32;
                        let left = grid.left() + grid.width() * start as f32;
                        let right = left + grid.width() * size as f32;
                        (
                            [egui::pos2(left, y), egui::pos2(right, y)],
                            egui::Rect::from_x_y_ranges(
                                left..=right,
                                (y - SPLITTER_GRAB)..=(y + SPLITTER_GRAB),
                            ),
                            egui::CursorIcon::ResizeVertical,
                        )
                    }
                };

                let id = ui
                    .id()
                    .with(("splitter", axis_key(axis), boundary, segment.start));
                let response = ui
                    .interact(grab, id, egui::Sense::drag())
                    .on_hover_cursor(cursor);

                if response.drag_started() {
                    session.begin_drag(axis, boundary);
                }
                if response.dragged() {
                    if let Some(pointer) = response.interact_pointer_pos() {
                        session.drag_move(grid_fraction(grid, axis, pointer));
                    }
                }
                if response.drag_stopped() {
                    session.end_drag();
                }

                let stroke = if response.hovered() || response.dragged() {
                    ui.visuals().widgets.hovered.fg_stroke
                } else {
                    stroke
                };
                ui.painter().line_segment(line, stroke);
            }
        }
    }
}

/// Pane covering a 1-based cell.
fn pane_at(plan: &GridPlan, row: usize, col: usize) -> Option<PaneIndex> {
    plan.placements
        .iter()
        .find(|p| {
            (p.span.row..p.span.row_end()).contains(&row)
                && (p.span.col..p.span.col_end()).contains(&col)
        })
        .map(|p| p.pane)
}

/// Runs of cross-axis tracks (1-based, end exclusive) along which
/// `boundary` separates two different panes.
fn splitter_segments(plan: &GridPlan, axis: Axis, boundary: usize) -> Vec<Range<usize>> {
    let before = boundary + 1;
    let after = boundary + 2;
    let mut segments: Vec<Range<usize>> = Vec::new();

    for track in 1..=plan.shape.extent(axis.cross()) {
        let (a, b) = match axis {
            Axis::Column => (pane_at(plan, track, before), pane_at(plan, track, after)),
            Axis::Row => (pane_at(plan, before, track), pane_at(plan, after, track)),
        };
        if a == b {
            continue;
        }
        match segments.last_mut() {
            Some(last) if last.end == track => last.end = track + 1,
            _ => segments.push(track..track + 1),
        }
    }
    segments
}

fn axis_key(axis: Axis) -> u8 {
    match axis {
        Axis::Column => 0,
        Axis::Row => 1,
    }
}

/// Pointer position as a fraction of the grid along `axis`.
fn grid_fraction(grid: egui::Rect, axis: Axis, pointer: egui::Pos2) -> f64 {
    let fraction = match axis {
        Axis::Column => (pointer.x - grid.left()) / grid.width().max(1.0),
        Axis::Row => (pointer.y - grid.top()) / grid.height().max(1.0),
    };
    f64::from(fraction)
}

/// Screen rectangle of a cell span inside the grid.
fn pane_rect(grid: egui::Rect, ratios: &RatioModel, span: CellSpan) -> egui::Rect {
    let (x, width) = ratios.span_fraction(Axis::Column, span.col, span.col_end());
    let (y, height) = ratios.span_fraction(Axis::Row, span.row, span.row_end());
    egui::Rect::from_min_size(
        grid.min + egui::vec2(grid.width() * x as f32, grid.height() * y as f32),
        egui::vec2(grid.width() * width as f32, grid.height() * height as f32),
    )
}

fn display_address(address: &str) -> String {
    if address == BLANK_ADDRESS {
        String::new()
    } else {
        address.to_string()
    }
}

fn address_inputs(urls: &[String]) -> Vec<String> {
    urls.iter().map(|u| display_address(u)).collect()
}

impl eframe::App for Splitgrid {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keyboard shortcuts (Ctrl+R, Ctrl+Q)
        let (reset, quit) = ctx.input(|input| {
            (
                input.modifiers.ctrl && input.key_pressed(egui::Key::R),
                input.modifiers.ctrl && input.key_pressed(egui::Key::Q),
            )
        });
        if reset {
            if let Some(session) = self.session.as_mut() {
                session.reset_ratios();
            }
        }
        if quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        self.poll_reset();
        self.render_status_bar(ctx);
        self.render_grid(ctx);

        ctx.request_repaint_after(RESET_POLL_INTERVAL);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        tracing::info!("Application shutting down");
        if let Some(session) = self.session.take() {
            session.end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitgrid_core::layout::GridShape;
    use splitgrid_core::packing::Placement;

    fn grid() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(200.0, 100.0))
    }

    #[test]
    fn test_pane_rect_uses_spans_and_ratios() {
        let mut ratios = RatioModel::new(GridShape::new(2, 2));
        let bottom = pane_rect(grid(), &ratios, CellSpan::new(2, 1, 1, 2));
        assert_eq!(bottom.min, egui::pos2(10.0, 70.0));
        assert_eq!(bottom.size(), egui::vec2(200.0, 50.0));

        ratios.set(&[0.25, 0.75], &[0.5, 0.5]).unwrap();
        let right = pane_rect(grid(), &ratios, CellSpan::unit(1, 2));
        assert_eq!(right.min, egui::pos2(60.0, 20.0));
        assert_eq!(right.width(), 150.0);
    }

    #[test]
    fn test_grid_fraction() {
        let pointer = egui::pos2(60.0, 95.0);
        assert!((grid_fraction(grid(), Axis::Column, pointer) - 0.25).abs() < 1e-6);
        assert!((grid_fraction(grid(), Axis::Row, pointer) - 0.75).abs() < 1e-6);
    }

    fn plan(shape: GridShape, spans: &[(PaneIndex, CellSpan)]) -> GridPlan {
        GridPlan {
            shape,
            placements: spans
                .iter()
                .map(|&(pane, span)| Placement { pane, span })
                .collect(),
        }
    }

    #[test]
    fn test_splitters_skip_panes_spanning_the_boundary() {
        // 2x2 after closing pane 2 horizontally: pane 3 spans row 2.
        let packed = plan(
            GridShape::new(2, 2),
            &[
                (0, CellSpan::unit(1, 1)),
                (1, CellSpan::unit(1, 2)),
                (3, CellSpan::new(2, 1, 1, 2)),
            ],
        );
        assert_eq!(splitter_segments(&packed, Axis::Column, 0), vec![1..2]);
        assert_eq!(splitter_segments(&packed, Axis::Row, 0), vec![1..3]);

        let uniform = plan(
            GridShape::new(2, 2),
            &[
                (0, CellSpan::unit(1, 1)),
                (1, CellSpan::unit(1, 2)),
                (2, CellSpan::unit(2, 1)),
                (3, CellSpan::unit(2, 2)),
            ],
        );
        assert_eq!(splitter_segments(&uniform, Axis::Column, 0), vec![1..3]);
        assert_eq!(pane_at(&uniform, 2, 2), Some(3));
        assert_eq!(pane_at(&uniform, 3, 1), None);
    }

    #[test]
    fn test_blank_addresses_show_empty() {
        let urls = vec!["about:blank".to_string(), "https://a.com".to_string()];
        assert_eq!(address_inputs(&urls), vec!["", "https://a.com"]);
    }
}
