//! # Splitgrid
//!
//! Desktop split view: arranges independent panes into a resizable grid,
//! re-packs the grid when panes are closed, and restores the layout of a
//! session across restarts.
//!
//! ## Usage
//!
//! ```bash
//! # Four panes in a 2x2 grid
//! splitgrid
//!
//! # Two panes side by side
//! splitgrid --mode dual
//!
//! # Six panes, reusing the host's query string
//! splitgrid --query "mode=quad&count=6"
//!
//! # Reopen a session by id, with debug logging
//! splitgrid --session 3f2a... --debug
//! ```

use clap::{Arg, Command};
use eframe::egui;
use splitgrid_core::{Config, LaunchParams, SessionMode};
use std::path::PathBuf;

mod app;

/// Command line arguments for Splitgrid
#[derive(Debug, Clone, Default)]
pub struct AppArgs {
    /// Session mode
    pub mode: Option<SessionMode>,
    /// Explicit pane count
    pub count: Option<usize>,
    /// Raw `mode=..&count=..` query, overrides `mode` and `count`
    pub query: Option<String>,
    /// Session id to resume
    pub session: Option<String>,
    /// State file overriding the configured one
    pub state_file: Option<PathBuf>,
    /// Configuration file overriding the default location
    pub config: Option<PathBuf>,
    /// Enable debug logging
    pub debug: bool,
}

impl AppArgs {
    /// Launch parameters, falling back to the configured default mode.
    pub fn launch_params(&self, config: &Config) -> LaunchParams {
        match &self.query {
            Some(query) => LaunchParams::from_query(query),
            None => LaunchParams::new(self.mode.unwrap_or(config.grid.default_mode), self.count),
        }
    }
}

fn command() -> Command {
    Command::new("Splitgrid")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Splitgrid Team")
        .about("Resizable multi-pane split view")
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("Session mode")
                .value_parser(["quad", "dual"]),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .value_name("PANES")
                .help("Number of panes (1-16)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .value_name("QUERY")
                .help("Launch query string, e.g. mode=quad&count=6")
                .conflicts_with_all(["mode", "count"]),
        )
        .arg(
            Arg::new("session")
                .short('s')
                .long("session")
                .value_name("ID")
                .help("Session id to resume"),
        )
        .arg(
            Arg::new("state-file")
                .long("state-file")
                .value_name("FILE")
                .help("Shared state file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Parse command line arguments
fn parse_args_from<I, T>(args: I) -> Result<AppArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;

    Ok(AppArgs {
        mode: matches
            .get_one::<String>("mode")
            .and_then(|m| SessionMode::parse(m)),
        count: matches.get_one::<usize>("count").copied(),
        query: matches.get_one::<String>("query").cloned(),
        session: matches.get_one::<String>("session").cloned(),
        state_file: matches.get_one::<PathBuf>("state-file").cloned(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        debug: matches.get_flag("debug"),
    })
}

/// Initialize logging based on arguments
fn init_logging(debug: bool, config: &Config) {
    let level = if debug { "debug" } else { config.logging.level.as_str() };
    splitgrid_core::init_tracing_with_level(level);
}

fn load_config(args: &AppArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_or_default(),
    };
    if let Some(state_file) = &args.state_file {
        config.storage.state_file = state_file.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = parse_args_from(std::env::args_os()).unwrap_or_else(|e| e.exit());
    let config = load_config(&args)?;
    init_logging(args.debug, &config);

    tracing::info!("Starting Splitgrid v{}", env!("CARGO_PKG_VERSION"));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Splitgrid"),
        ..Default::default()
    };

    eframe::run_native(
        "Splitgrid",
        options,
        Box::new(move |cc| {
            setup_visuals(&cc.egui_ctx);
            Ok(Box::new(app::Splitgrid::new(&args, &config)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Application exited with error: {}", e))
}

/// Setup visual theme for the application
fn setup_visuals(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.selection.bg_fill = egui::Color32::from_rgb(64, 128, 192);
    visuals.hyperlink_color = egui::Color32::from_rgb(100, 160, 220);
    ctx.set_visuals(visuals);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_args_default() {
        let args = AppArgs::default();
        assert!(args.session.is_none());
        assert!(!args.debug);
        assert_eq!(
            args.launch_params(&Config::default()),
            LaunchParams::new(SessionMode::Quad, None)
        );
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args_from(["splitgrid", "--mode", "dual", "-n", "3", "--debug"]).unwrap();
        assert_eq!(args.mode, Some(SessionMode::Dual));
        assert_eq!(args.count, Some(3));
        assert!(args.debug);
        assert_eq!(
            args.launch_params(&Config::default()),
            LaunchParams::new(SessionMode::Dual, Some(3))
        );
    }

    #[test]
    fn test_query_conflicts_with_mode() {
        assert!(parse_args_from(["splitgrid", "--query", "count=6", "--mode", "dual"]).is_err());
        let args = parse_args_from(["splitgrid", "--query", "?mode=quad&count=6"]).unwrap();
        assert_eq!(args.launch_params(&Config::default()).requested_count(), 6);
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(parse_args_from(["splitgrid", "--mode", "triple"]).is_err());
    }
}
