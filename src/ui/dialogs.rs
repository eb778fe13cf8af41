// =============================================================================
// Fichier : dialogs.rs
// Rôle    : Dialogues d'erreur (rapports en cours d'exécution, erreur fatale)
// =============================================================================

use gtk4::prelude::*;
use gtk4::{gio, glib};
use libadwaita::prelude::*;

use crate::core::reporter::ErrorReport;

/// Affiche chaque rapport d'erreur dans un `adw::AlertDialog`, l'un après
/// l'autre, tant que la fenêtre existe.
pub fn show_error_reports(
    window: &libadwaita::ApplicationWindow,
    reports: async_channel::Receiver<ErrorReport>,
) {
    let window = window.downgrade();
    glib::spawn_future_local(async move {
        while let Ok(report) = reports.recv().await {
            let Some(window) = window.upgrade() else {
                break;
            };
            let dialog = libadwaita::AlertDialog::new(Some("Erreur"), Some(&report.text()));
            dialog.add_response("close", "Fermer");
            dialog.set_default_response(Some("close"));
            dialog.set_close_response("close");
            let (closed_tx, closed_rx) = async_channel::bounded::<()>(1);
            dialog.connect_response(None, move |_, _| {
                let _ = closed_tx.try_send(());
            });
            dialog.present(Some(&window));
            drop(window);
            // Un dialogue à la fois.
            let _ = closed_rx.recv().await;
        }
    });
}

/// Erreur empêchant le démarrage : dialogue bloquant puis sortie.
///
/// L'application est maintenue en vie jusqu'à la fermeture du dialogue,
/// faute de fenêtre principale.
pub fn show_fatal(app: &libadwaita::Application, message: &str) {
    log::error!("Démarrage impossible : {message}");
    let guard = app.hold();
    let dialog = gtk4::AlertDialog::builder()
        .modal(true)
        .message("Impossible de démarrer ltchiptool")
        .detail(message)
        .build();
    let app = app.clone();
    dialog.choose(None::<&gtk4::Window>, gio::Cancellable::NONE, move |_| {
        drop(guard);
        app.quit();
    });
}
