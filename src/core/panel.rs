// =============================================================================
// Fichier : panel.rs
// Rôle    : Contrat de cycle de vie des panneaux et de la fenêtre principale
//
// SOLID : ces traits n'ont aucune dépendance vers GTK ; la couche UI les
// implémente (Panel, MainFrame) et la session les orchestre.
// =============================================================================

use std::path::PathBuf;

use crate::core::settings::{MainSettings, PanelSettings};

/// Paramètres de démarrage transmis une fois à chaque panneau.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitParams {
    /// Fichier passé en ligne de commande.
    pub file: Option<PathBuf>,
}

/// Points d'extension d'un panneau, tous optionnels.
pub trait PanelHooks {
    fn set_init_params(&self, _params: &InitParams) {}

    /// Instantané des paramètres à persister.
    fn settings(&self) -> PanelSettings {
        PanelSettings::new()
    }

    fn set_settings(&self, _settings: &PanelSettings) {}

    /// Appelé une fois, après que tous les panneaux ont reçu leurs paramètres.
    fn on_show(&self) {}

    /// Arrête les tâches de fond du panneau ; bloque jusqu'à leur fin.
    fn on_close(&self) {}

    /// L'onglet du panneau devient l'onglet actif.
    fn on_activate(&self) {}

    /// L'onglet du panneau cesse d'être l'onglet actif.
    fn on_deactivate(&self) {}

    fn on_menu(&self, _title: &str, _label: &str, _checked: bool) {}

    fn on_file_drop(&self, _files: &[PathBuf]) {}
}

/// Fenêtre principale vue par la session.
pub trait FrameWindow {
    /// Position, taille et onglet actif courants.
    fn main_settings(&self) -> MainSettings;

    /// Applique les champs présents ; un onglet inconnu est ignoré.
    fn apply_main_settings(&self, settings: &MainSettings);
}
