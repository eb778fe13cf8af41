// =============================================================================
// Fichier : worker.rs
// Rôle    : Supervision des tâches de fond d'un panneau (threads coopératifs)
//
// Principe :
//   - Chaque worker tourne dans son propre thread et reçoit un jeton
//     d'annulation qu'il doit consulter régulièrement.
//   - En fin d'exécution, le thread envoie un événement de complétion
//     (async_channel) que l'UI consomme sur son propre thread.
//   - Un worker qui panique est remonté comme en échec : la complétion
//     part toujours, une seule fois.
//   - Aucun arrêt forcé : `shutdown()` annule puis attend chaque thread.
// =============================================================================

use std::any::TypeId;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::core::reporter::ErrorReporter;

/// Unité de travail exécutée en arrière-plan.
pub trait Worker: Send + 'static {
    /// Nom court, utilisé pour le nom du thread et les logs.
    fn name(&self) -> &str;

    /// Corps du worker. Doit rendre la main dès que `cancel` est annulé.
    fn run(&mut self, cancel: &CancellationToken) -> Result<()>;
}

/// Identifiant d'un worker au sein de son superviseur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkId(u64);

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issue d'un worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    Finished,
    Cancelled,
    Failed,
}

/// Worker terminé, tel que remonté à l'UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedWork {
    pub id: WorkId,
    pub name: String,
    pub kind: TypeId,
    /// Le worker avait gelé l'UI : elle doit être réactivée.
    pub freeze_ui: bool,
    pub outcome: WorkOutcome,
}

impl CompletedWork {
    /// Vrai si le worker terminé est de type `W`.
    pub fn is<W: Worker>(&self) -> bool {
        self.kind == TypeId::of::<W>()
    }
}

#[derive(Debug)]
struct StopEvent {
    id: WorkId,
    outcome: WorkOutcome,
}

struct ActiveWork {
    id: WorkId,
    name: String,
    kind: TypeId,
    freeze_ui: bool,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

/// Superviseur des workers d'un panneau.
pub struct WorkSupervisor {
    active: Vec<ActiveWork>,
    next_id: u64,
    reporter: ErrorReporter,
    events_tx: async_channel::Sender<StopEvent>,
    events_rx: async_channel::Receiver<StopEvent>,
}

impl WorkSupervisor {
    pub fn new(reporter: ErrorReporter) -> Self {
        let (events_tx, events_rx) = async_channel::unbounded();
        Self {
            active: Vec::new(),
            next_id: 0,
            reporter,
            events_tx,
            events_rx,
        }
    }

    /// Enregistre puis démarre un worker dans un nouveau thread.
    pub fn start<W: Worker>(&mut self, mut worker: W, freeze_ui: bool) -> Result<WorkId> {
        let id = WorkId(self.next_id);
        self.next_id += 1;
        let name = worker.name().to_string();
        let cancel = CancellationToken::new();

        let thread_cancel = cancel.clone();
        let tx = self.events_tx.clone();
        let reporter = self.reporter.clone();
        let thread = thread::Builder::new()
            .name(format!("work-{name}"))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| worker.run(&thread_cancel)));
                let outcome = match result {
                    Ok(Ok(())) if thread_cancel.is_cancelled() => WorkOutcome::Cancelled,
                    Ok(Ok(())) => WorkOutcome::Finished,
                    Ok(Err(e)) => {
                        reporter.report(&e, Some(&format!("Tâche '{}' en échec", worker.name())));
                        WorkOutcome::Failed
                    }
                    // Le hook de panic a déjà signalé l'erreur.
                    Err(_) => {
                        log::error!("Tâche '{}' interrompue par un panic", worker.name());
                        WorkOutcome::Failed
                    }
                };
                // Le superviseur a pu disparaître entre-temps : rien à notifier.
                let _ = tx.try_send(StopEvent { id, outcome });
            })
            .with_context(|| format!("Impossible de démarrer la tâche '{name}'"))?;

        log::debug!("Tâche '{name}' {id} démarrée (gel UI : {freeze_ui})");
        self.active.push(ActiveWork {
            id,
            name,
            kind: TypeId::of::<W>(),
            freeze_ui,
            cancel,
            thread: Some(thread),
        });
        Ok(id)
    }

    /// Demande l'arrêt de tous les workers actifs de type `W`.
    pub fn stop<W: Worker>(&self) -> usize {
        let kind = TypeId::of::<W>();
        let mut count = 0;
        for work in self.active.iter().filter(|w| w.kind == kind) {
            work.cancel.cancel();
            count += 1;
        }
        count
    }

    /// Récupère les workers terminés depuis le dernier appel.
    ///
    /// Chaque worker n'est remonté qu'une fois ; les événements de workers déjà
    /// retirés par `shutdown()` sont ignorés.
    pub fn poll_completed(&mut self) -> Vec<CompletedWork> {
        let mut done = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            let Some(pos) = self.active.iter().position(|w| w.id == event.id) else {
                continue;
            };
            let mut work = self.active.remove(pos);
            // Le thread a envoyé son dernier message : le join est immédiat.
            if let Some(thread) = work.thread.take() {
                let _ = thread.join();
            }
            log::debug!("Tâche '{}' {} terminée : {:?}", work.name, work.id, event.outcome);
            done.push(CompletedWork {
                id: work.id,
                name: work.name,
                kind: work.kind,
                freeze_ui: work.freeze_ui,
                outcome: event.outcome,
            });
        }
        done
    }

    /// Annule tous les workers puis attend la fin de chaque thread.
    ///
    /// Sans délai maximal : un worker qui ignore son jeton bloque l'appelant.
    pub fn shutdown(&mut self) {
        for work in &self.active {
            work.cancel.cancel();
        }
        for mut work in self.active.drain(..) {
            if let Some(thread) = work.thread.take() {
                if thread.join().is_err() {
                    log::warn!("La tâche '{}' s'est terminée sur un panic", work.name);
                }
            }
        }
        while self.events_rx.try_recv().is_ok() {}
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_running<W: Worker>(&self) -> bool {
        let kind = TypeId::of::<W>();
        self.active.iter().any(|w| w.kind == kind)
    }
}

impl Drop for WorkSupervisor {
    fn drop(&mut self) {
        if !self.active.is_empty() {
            self.shutdown();
        }
    }
}
