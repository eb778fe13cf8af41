// =============================================================================
// Fichier : menu_bar.rs
// Rôle    : Construction de la barre de menu depuis le modèle du layout
//
// Chaque entrée du modèle est enregistrée dans le `MenuRouter` et reçoit une
// action `win.cmd-<n>`. Attributs reconnus sur une entrée :
//   - checkable="true" : action à état booléen (case à cocher)
//   - checked="true"   : état initial coché
//   - accel            : raccourci clavier
// =============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{gio, glib};

use crate::core::menu::{CommandId, MenuEntry, MenuRouter};

/// Actions des entrées cochables, pour refléter dans le menu un état
/// modifié ailleurs (case à cocher d'un panneau).
#[derive(Clone, Default)]
pub struct MenuChecks(Rc<RefCell<Vec<(MenuEntry, gio::SimpleAction)>>>);

impl MenuChecks {
    pub fn set_checked(&self, title: &str, label: &str, checked: bool) {
        let actions = self.0.borrow();
        let Some((_, action)) = actions
            .iter()
            .find(|(entry, _)| entry.is_checkable(title, label))
        else {
            return;
        };
        let current = action.state().and_then(|state| state.get::<bool>());
        if current != Some(checked) {
            action.set_state(&checked.to_variant());
        }
    }
}

/// Entrée feuille collectée lors du parcours du modèle.
struct LeafAction {
    id: CommandId,
    checkable: bool,
    checked: bool,
    accel: Option<String>,
}

fn string_attribute(model: &gio::MenuModel, index: i32, name: &str) -> Option<String> {
    model
        .item_attribute_value(index, name, Some(glib::VariantTy::STRING))
        .and_then(|value| value.get::<String>())
}

/// Recopie `source` en remplaçant les actions par celles du routeur.
/// `title` est le titre du menu de premier niveau en cours.
fn rebuild(
    source: &gio::MenuModel,
    title: Option<&str>,
    router: &mut MenuRouter,
    leaves: &mut Vec<LeafAction>,
) -> gio::Menu {
    let menu = gio::Menu::new();
    for index in 0..source.n_items() {
        let label = string_attribute(source, index, "label");

        if let Some(section) = source.item_link(index, "section") {
            let section = rebuild(&section, title, router, leaves);
            menu.append_section(label.as_deref(), &section);
            continue;
        }

        let Some(label) = label else {
            log::warn!("Entrée de menu sans libellé ignorée");
            continue;
        };

        if let Some(submenu) = source.item_link(index, "submenu") {
            let sub_title = title.unwrap_or(label.as_str());
            let submenu = rebuild(&submenu, Some(sub_title), router, leaves);
            menu.append_submenu(Some(&label), &submenu);
            continue;
        }

        let Some(title) = title else {
            log::warn!("Entrée '{label}' hors de tout menu ignorée");
            continue;
        };
        let checkable = string_attribute(source, index, "checkable").as_deref() == Some("true");
        let checked = string_attribute(source, index, "checked").as_deref() == Some("true");
        let accel = string_attribute(source, index, "accel");
        let id = router.register(title, &label, checkable);

        let item = gio::MenuItem::new(Some(&label), Some(&format!("win.{id}")));
        if let Some(accel) = &accel {
            item.set_attribute_value("accel", Some(&accel.to_variant()));
        }
        menu.append_item(&item);
        leaves.push(LeafAction {
            id,
            checkable,
            checked,
            accel,
        });
    }
    menu
}

/// Construit la barre de menu et installe ses actions sur `window`.
///
/// `on_command` reçoit l'identifiant activé et, pour une entrée cochable,
/// son nouvel état.
pub fn build(
    model: &gio::MenuModel,
    window: &libadwaita::ApplicationWindow,
    router: &mut MenuRouter,
    checks: &MenuChecks,
    on_command: Rc<dyn Fn(CommandId, bool)>,
) -> gtk4::PopoverMenuBar {
    let mut leaves = Vec::new();
    let menu = rebuild(model, None, router, &mut leaves);

    log::debug!("{} entrées de menu enregistrées", leaves.len());

    let app = window.application();
    for leaf in leaves {
        let name = leaf.id.to_string();
        let action = if leaf.checkable {
            gio::SimpleAction::new_stateful(&name, None, &leaf.checked.to_variant())
        } else {
            gio::SimpleAction::new(&name, None)
        };
        let id = leaf.id;
        let checkable = leaf.checkable;
        let handler = on_command.clone();
        action.connect_activate(move |action, _| {
            let checked = if checkable {
                let checked = !action
                    .state()
                    .and_then(|state| state.get::<bool>())
                    .unwrap_or(false);
                action.set_state(&checked.to_variant());
                checked
            } else {
                false
            };
            handler(id, checked);
        });
        window.add_action(&action);
        if leaf.checkable {
            if let Some(entry) = router.entry(leaf.id) {
                checks.0.borrow_mut().push((entry.clone(), action.clone()));
            }
        }

        if let (Some(app), Some(accel)) = (&app, &leaf.accel) {
            app.set_accels_for_action(&format!("win.{name}"), &[accel.as_str()]);
        }
    }
    gtk4::PopoverMenuBar::from_model(Some(&menu))
}
