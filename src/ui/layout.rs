// =============================================================================
// Fichier : layout.rs
// Rôle    : Chargement des layouts GtkBuilder (fichier .ui) et recherche de
//           widgets par nom
// =============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use gtk4::prelude::*;
use gtk4::{gio, glib};
use thiserror::Error;

/// Échecs liés au layout. Un widget absent est une erreur de programmation
/// (layout et code désynchronisés) : elle remonte jusqu'à la construction
/// du panneau concerné.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("impossible de lire le layout {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("impossible de charger '{name}' depuis le layout : {message}")]
    Load { name: String, message: String },
    #[error("widget '{0}' introuvable dans le layout")]
    Missing(String),
    #[error("'{name}' n'est pas un {expected}")]
    WrongType { name: String, expected: &'static str },
}

/// Fichier de layout chargé en mémoire ; chaque panneau en instancie sa part.
#[derive(Debug)]
pub struct Layout {
    source: String,
}

impl Layout {
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let source = fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Layout chargé depuis {}", path.display());
        Ok(Self { source })
    }

    /// Instancie l'objet `root` et ses enfants dans un nouveau `Builder`.
    pub fn instantiate(&self, root: &str) -> Result<LoadedLayout, LayoutError> {
        let builder = gtk4::Builder::new();
        builder
            .add_objects_from_string(&self.source, &[root])
            .map_err(|e| LayoutError::Load {
                name: root.to_string(),
                message: e.to_string(),
            })?;
        let loaded = LoadedLayout { builder };
        // Échoue tout de suite si la racine n'existe pas.
        loaded.object::<glib::Object>(root)?;
        Ok(loaded)
    }

    /// Modèle de menu nommé (`<menu id="...">`).
    pub fn menu(&self, name: &str) -> Result<gio::MenuModel, LayoutError> {
        self.instantiate(name)?.object(name)
    }
}

/// Objets instanciés depuis un layout.
pub struct LoadedLayout {
    builder: gtk4::Builder,
}

impl LoadedLayout {
    /// Objet nommé, du type attendu.
    pub fn object<T: IsA<glib::Object>>(&self, name: &str) -> Result<T, LayoutError> {
        let object = self
            .builder
            .object::<glib::Object>(name)
            .ok_or_else(|| LayoutError::Missing(name.to_string()))?;
        object.downcast::<T>().map_err(|_| LayoutError::WrongType {
            name: name.to_string(),
            expected: T::static_type().name(),
        })
    }
}

#[cfg(test)]
mod tests {
    const LAYOUT: &str = include_str!("../../resources/ltchiptool.ui");

    #[test]
    fn layout_defines_every_named_object() {
        let ids = [
            "main_menubar",
            "log_panel",
            "combo_level",
            "check_auto_scroll",
            "button_clear",
            "text_log",
            "flash_panel",
            "combo_port",
            "button_rescan",
            "combo_baudrate",
            "radio_write",
            "radio_read",
            "input_file",
            "button_browse",
            "button_check",
            "button_cancel",
            "text_status",
            "text_image",
            "about_panel",
            "bmp_logo",
            "text_tool_version",
            "text_lt_version",
            "text_build_date_title",
            "text_build_date",
            "button_path",
        ];
        for id in ids {
            assert!(LAYOUT.contains(&format!("id=\"{id}\"")), "id '{id}' absent du layout");
        }
    }

    #[test]
    fn builtin_menu_entries_are_present() {
        for label in ["_File", "_Quit", "_Debug", "_Print settings", "_Auto-scroll"] {
            assert!(LAYOUT.contains(&format!(">{label}<")), "entrée '{label}' absente");
        }
    }
}
