// =============================================================================
// Fichier : mod.rs
// Rôle    : Panneaux de la fenêtre principale et contexte de construction
// =============================================================================

pub mod about_panel;
pub mod base;
pub mod flash_panel;
pub mod log_panel;

use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::DropDown;

use crate::core::install::Installation;
use crate::core::reporter::ErrorReporter;
use crate::core::resources::ResourcePaths;
use crate::ui::layout::Layout;
use crate::ui::menu_bar::MenuChecks;

pub use base::{BasePanel, Panel, SelfRef};

/// Ce dont un panneau a besoin pour se construire.
pub struct PanelContext {
    pub layout: Rc<Layout>,
    pub resources: ResourcePaths,
    pub installation: Installation,
    pub reporter: ErrorReporter,
    pub menu_checks: MenuChecks,
}

/// Constructeur d'onglet (panneaux intégrés et plugins).
pub type PanelFactory = fn(&PanelContext) -> anyhow::Result<Rc<dyn Panel>>;

/// Texte sélectionné d'un `DropDown` à modèle `StringList`.
pub(crate) fn dropdown_text(dropdown: &DropDown) -> Option<String> {
    let model = dropdown.model()?;
    let item = model.item(dropdown.selected())?;
    let string_obj = item.downcast::<gtk4::StringObject>().ok()?;
    Some(string_obj.string().to_string())
}

/// Sélectionne `value` dans un `DropDown` à modèle `StringList` ; retourne
/// `false` si la valeur est absente.
pub(crate) fn set_dropdown_by_text(dropdown: &DropDown, value: &str) -> bool {
    let Some(model) = dropdown.model() else {
        return false;
    };
    for idx in 0..model.n_items() {
        let Some(item) = model.item(idx) else {
            continue;
        };
        let Ok(string_obj) = item.downcast::<gtk4::StringObject>() else {
            continue;
        };
        if string_obj.string() == value {
            dropdown.set_selected(idx);
            return true;
        }
    }
    false
}
