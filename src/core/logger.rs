// =============================================================================
// Fichier : logger.rs
// Rôle    : Initialisation du logging (console + panneau de log)
// =============================================================================

use std::io::Write;

use chrono::{DateTime, Local};
use env_logger::Builder;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Capacité du canal vers le panneau de log ; au-delà, les lignes sont perdues.
const UI_CHANNEL_CAPACITY: usize = 2048;

/// Ligne de log transmise au panneau de log.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub time: DateTime<Local>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogLine {
    /// Format : `[HH:MM:SS] LEVEL message`
    pub fn display(&self) -> String {
        format!(
            "[{}] {:<5} {}",
            self.time.format("%H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// Logger qui délègue à `env_logger` et duplique chaque ligne vers l'UI.
struct TeeLogger {
    console: env_logger::Logger,
    ui: async_channel::Sender<LogLine>,
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if self.console.enabled(record.metadata()) {
            self.console.log(record);
        }
        // Jamais bloquant : si l'UI ne suit pas, la ligne est abandonnée.
        let _ = self.ui.try_send(LogLine {
            time: Local::now(),
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {
        self.console.flush();
    }
}

/// Initialise le système de logging avec un format professionnel.
///
/// Format console : `[YYYY-MM-DD HH:MM:SS] LEVEL module - message`
///
/// Retourne le récepteur des lignes destinées au panneau de log. Le niveau
/// reste ajustable ensuite via `log::set_max_level`.
pub fn init_logger(level: LevelFilter) -> async_channel::Receiver<LogLine> {
    let console = Builder::new()
        .filter_level(LevelFilter::Trace)
        .format(|buf, record| {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let level = record.level();
            let target = record.target();
            writeln!(buf, "[{timestamp}] {level:<5} {target} - {}", record.args())
        })
        .build();

    let (tx, rx) = async_channel::bounded(UI_CHANNEL_CAPACITY);
    let logger = TeeLogger { console, ui: tx };
    if log::set_boxed_logger(Box::new(logger)).is_err() {
        eprintln!("Logger déjà initialisé");
    }
    log::set_max_level(level);
    rx
}

/// Niveaux proposés dans le panneau de log, dans l'ordre d'affichage.
pub const LEVELS: [LevelFilter; 5] = [
    LevelFilter::Error,
    LevelFilter::Warn,
    LevelFilter::Info,
    LevelFilter::Debug,
    LevelFilter::Trace,
];

/// Convertit un nom de niveau ("info", "DEBUG", ...) ; `None` si inconnu.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_uses_short_time_and_padded_level() {
        let line = LogLine {
            time: Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap(),
            level: Level::Info,
            target: "ltchiptool_gui".into(),
            message: "Configuration chargée".into(),
        };
        assert_eq!(line.display(), "[09:05:07] INFO  Configuration chargée");
    }

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("verbose"), None);
    }
}
