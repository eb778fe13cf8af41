// =============================================================================
// Fichier : registry.rs
// Rôle    : Registre ordonné des panneaux (identifiant → instance)
// =============================================================================

use std::rc::Rc;

use thiserror::Error;

use crate::core::settings::MAIN_KEY;

/// Identifiants des panneaux intégrés.
pub const LOG_PANEL: &str = "log";
pub const FLASH_PANEL: &str = "flash";
pub const ABOUT_PANEL: &str = "about";

/// Identifiant d'un panneau fourni par un plugin : `plugin.<plugin>.<élément>`.
pub fn plugin_panel_id(plugin: &str, gui_name: &str) -> String {
    format!("plugin.{plugin}.{gui_name}")
}

/// Erreurs d'enregistrement d'un panneau.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("identifiant de panneau déjà utilisé : {0}")]
    Duplicate(String),
    #[error("identifiant de panneau réservé : {0}")]
    Reserved(String),
}

/// Registre ordonné : l'ordre d'insertion donne l'ordre des onglets.
pub struct PanelRegistry<P: ?Sized> {
    panels: Vec<(String, Rc<P>)>,
}

impl<P: ?Sized> PanelRegistry<P> {
    pub const fn new() -> Self {
        Self { panels: Vec::new() }
    }

    /// Ajoute un panneau ; un identifiant déjà présent est refusé.
    pub fn insert(&mut self, id: &str, panel: Rc<P>) -> Result<(), RegistryError> {
        if id == MAIN_KEY {
            return Err(RegistryError::Reserved(id.to_string()));
        }
        if self.contains(id) {
            return Err(RegistryError::Duplicate(id.to_string()));
        }
        self.panels.push((id.to_string(), panel));
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.panels.iter().any(|(name, _)| name == id)
    }

    pub fn get(&self, id: &str) -> Option<&Rc<P>> {
        self.panels
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, panel)| panel)
    }

    #[cfg(test)]
    /// Identifiant d'une instance (comparaison de pointeurs).
    pub fn id_of(&self, panel: &Rc<P>) -> Option<&str> {
        self.panels
            .iter()
            .find(|(_, p)| Rc::ptr_eq(p, panel))
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<P>)> {
        self.panels.iter().map(|(name, panel)| (name.as_str(), panel))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

impl<P: ?Sized> Default for PanelRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
