// =============================================================================
// Fichier : reporter.rs
// Rôle    : Service unique de signalement des erreurs (UI, workers, panics)
//
// Toute erreur non rattrapée, quel que soit le thread, passe par ici :
//   - journalisée au niveau ERROR ;
//   - transmise à l'UI (async_channel) qui affiche un dialogue.
// Le core ne dépend d'aucun toolkit : c'est l'UI qui consomme les rapports.
// =============================================================================

use std::fmt;
use std::panic;
use std::sync::Arc;

/// Rapport d'erreur destiné à l'utilisateur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Message contextuel optionnel (ex: "Impossible de construire flash").
    pub context: Option<String>,
    /// Nature de l'erreur ("Error", "Panic", ...).
    pub kind: String,
    pub message: String,
}

impl ErrorReport {
    /// Texte affiché dans le dialogue.
    pub fn text(&self) -> String {
        let text = format!("{}: {}", self.kind, self.message);
        match &self.context {
            Some(context) => format!("{context}\n\n{text}"),
            None => text,
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

struct Inner {
    tx: async_channel::Sender<ErrorReport>,
    rx: async_channel::Receiver<ErrorReport>,
}

/// Poignée clonable vers le service de signalement.
#[derive(Clone)]
pub struct ErrorReporter {
    inner: Arc<Inner>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self {
            inner: Arc::new(Inner { tx, rx }),
        }
    }

    /// Signale une erreur avec un contexte optionnel.
    pub fn report(&self, err: &anyhow::Error, context: Option<&str>) {
        match context {
            Some(context) => log::error!("{context} : {err:#}"),
            None => log::error!("{err:#}"),
        }
        self.push(ErrorReport {
            context: context.map(str::to_string),
            kind: "Error".to_string(),
            message: format!("{err:#}"),
        });
    }

    /// Signale un panic survenu dans le thread `thread`.
    pub fn report_panic(&self, thread: &str, message: &str, location: Option<&str>) {
        match location {
            Some(location) => log::error!("Panic dans le thread '{thread}' ({location}) : {message}"),
            None => log::error!("Panic dans le thread '{thread}' : {message}"),
        }
        self.push(ErrorReport {
            context: Some(format!("Thread '{thread}'")),
            kind: "Panic".to_string(),
            message: message.to_string(),
        });
    }

    fn push(&self, report: ErrorReport) {
        // Canal non borné : l'échec n'est possible que s'il est fermé.
        if self.inner.tx.try_send(report).is_err() {
            log::debug!("Canal des rapports d'erreur fermé");
        }
    }

    /// Récepteur des rapports, consommé par l'UI.
    pub fn subscribe(&self) -> async_channel::Receiver<ErrorReport> {
        self.inner.rx.clone()
    }

    /// Redirige les panics de tous les threads vers ce service.
    pub fn install_panic_hook(&self) {
        let reporter = self.clone();
        panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic sans message".to_string());
            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()));
            let thread = std::thread::current();
            let name = thread.name().unwrap_or("<anonyme>");
            reporter.report_panic(name, &message, location.as_deref());
        }));
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn report_text_is_prefixed_by_context() {
        let reporter = ErrorReporter::new();
        let rx = reporter.subscribe();

        reporter.report(&anyhow!("port occupé"), Some("Impossible de construire flash"));
        reporter.report(&anyhow!("boom"), None);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.text(), "Impossible de construire flash\n\nError: port occupé");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.text(), "Error: boom");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn error_chain_is_kept_in_message() {
        let reporter = ErrorReporter::new();
        let rx = reporter.subscribe();
        let err = anyhow!("fichier absent").context("lecture du firmware");
        reporter.report(&err, None);
        assert_eq!(rx.try_recv().unwrap().message, "lecture du firmware: fichier absent");
    }

    #[test]
    fn clones_share_the_same_channel() {
        let reporter = ErrorReporter::new();
        let rx = reporter.subscribe();
        let clone = reporter.clone();
        std::thread::spawn(move || clone.report_panic("work-scan", "oups", None))
            .join()
            .unwrap();
        let report = rx.try_recv().unwrap();
        assert_eq!(report.kind, "Panic");
        assert_eq!(report.context.as_deref(), Some("Thread 'work-scan'"));
    }
}
