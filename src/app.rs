// =============================================================================
// Fichier : app.rs
// Rôle    : Configuration et lancement de l'application GTK4/Libadwaita
// =============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gtk4::glib;
use gtk4::prelude::*;

use crate::ui::dialogs::show_fatal;
use crate::ui::main_frame::{MainFrame, Startup};

/// Construit et lance l'application.
///
/// La ligne de commande est déjà analysée par `main` : GTK ne reçoit aucun
/// argument.
pub fn run(startup: Startup) -> glib::ExitCode {
    let app = libadwaita::Application::builder()
        .application_id("io.github.libretiny.ltchiptool")
        .build();

    // Stocker la référence à la fenêtre pour éviter le drop prématuré
    let main_frame: Rc<RefCell<Option<Rc<MainFrame>>>> = Rc::new(RefCell::new(None));
    let startup = RefCell::new(Some(startup));
    let failed = Rc::new(Cell::new(false));

    let frame_slot = main_frame.clone();
    let startup_failed = failed.clone();
    app.connect_activate(move |app| {
        let Some(startup) = startup.borrow_mut().take() else {
            // Seconde activation : ramener la fenêtre existante.
            if let Some(frame) = frame_slot.borrow().as_ref() {
                frame.window.present();
            }
            return;
        };
        match MainFrame::new(app, startup) {
            Ok(frame) => *frame_slot.borrow_mut() = Some(frame),
            Err(e) => {
                startup_failed.set(true);
                show_fatal(app, &e.to_string());
            }
        }
    });

    let code = app.run_with_args::<&str>(&[]);
    drop(main_frame);
    if failed.get() {
        glib::ExitCode::FAILURE
    } else {
        code
    }
}
