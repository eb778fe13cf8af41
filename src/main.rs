// =============================================================================
// ltchiptool-gui — Interface graphique de flashage de firmware LibreTiny
// =============================================================================
//
// Architecture :
//   core/   — Logique sans toolkit (paramètres, session, workers, menu, ...)
//   ui/     — Interface GTK4/Libadwaita (fenêtre principale, panneaux)
//   app.rs  — Bootstrap de l'application
//
// Technologies :
//   Rust + GTK4 + Libadwaita + serialport
//
// Licence : MIT
// =============================================================================

mod app;
mod core;
mod ui;

use std::path::PathBuf;

use clap::Parser;
use gtk4::glib;
use log::LevelFilter;

use crate::core::panel::InitParams;
use crate::core::reporter::ErrorReporter;
use crate::core::resources::ResourcePaths;
use crate::ui::main_frame::Startup;

/// Interface graphique de ltchiptool.
#[derive(Debug, Parser)]
#[command(name = "ltchiptool-gui", version, about)]
struct Cli {
    /// Fichier firmware à ouvrir dans l'onglet de flashage
    file: Option<PathBuf>,

    /// Logs détaillés (niveau debug)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> glib::ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_lines = crate::core::logger::init_logger(level);
    log::info!("Démarrage de ltchiptool-gui v{}", env!("CARGO_PKG_VERSION"));

    let reporter = ErrorReporter::new();
    reporter.install_panic_hook();

    app::run(Startup {
        reporter,
        log_lines,
        init_params: InitParams { file: cli.file },
        resources: ResourcePaths::resolve(),
    })
}
