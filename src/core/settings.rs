// =============================================================================
// Fichier : settings.rs
// Rôle    : Document de configuration persistant (gui.json), une entrée par panneau
// =============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Clé réservée aux paramètres de la fenêtre principale.
pub const MAIN_KEY: &str = "main";

/// Nom du fichier de configuration courant.
pub const SETTINGS_FILE: &str = "gui.json";

/// Ancien nom du fichier, migré au démarrage.
pub const LEGACY_SETTINGS_FILE: &str = "config.json";

/// Paramètres propres à un panneau (objet JSON libre).
pub type PanelSettings = Map<String, Value>;

// =============================================================================
// Paramètres de la fenêtre principale
// =============================================================================

/// Position, taille et onglet actif de la fenêtre principale.
///
/// Chaque champ est optionnel : un champ absent laisse la valeur courante.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<(i32, i32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<(i32, i32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

// =============================================================================
// Document complet
// =============================================================================

/// Document JSON complet : identifiant de panneau → paramètres du panneau.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsDocument(Map<String, Value>);

impl SettingsDocument {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paramètres de la fenêtre principale ; les valeurs mal formées sont ignorées.
    pub fn main(&self) -> MainSettings {
        match self.0.get(MAIN_KEY) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                log::warn!("Paramètres \"{MAIN_KEY}\" invalides, ignorés : {e}");
                MainSettings::default()
            }),
            None => MainSettings::default(),
        }
    }

    pub fn set_main(&mut self, main: &MainSettings) {
        let value = serde_json::to_value(main).unwrap_or_else(|_| Value::Object(Map::new()));
        self.0.insert(MAIN_KEY.to_string(), value);
    }

    /// Paramètres d'un panneau, `None` si absents (le panneau garde ses défauts).
    pub fn panel(&self, id: &str) -> Option<&PanelSettings> {
        self.0.get(id).and_then(Value::as_object)
    }

    pub fn set_panel(&mut self, id: &str, settings: PanelSettings) {
        self.0.insert(id.to_string(), Value::Object(settings));
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// =============================================================================
// Stockage sur disque
// =============================================================================

/// Lecture/écriture du document de configuration.
///
/// Le fichier est relu puis réécrit en entier, sans verrou : une seule instance
/// de l'application est supposée l'utiliser.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    legacy_path: PathBuf,
}

impl SettingsStore {
    /// Crée un gestionnaire dans le répertoire donné.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(SETTINGS_FILE),
            legacy_path: dir.join(LEGACY_SETTINGS_FILE),
        }
    }

    /// Gestionnaire dans le répertoire de configuration de l'utilisateur.
    pub fn new() -> Self {
        Self::in_dir(&Self::default_dir())
    }

    /// Répertoire par défaut de la configuration.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ltchiptool")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renomme l'ancien `config.json` en `gui.json`, en écrasant un éventuel
    /// `gui.json` existant. Retourne `true` si une migration a eu lieu.
    pub fn migrate_legacy(&self) -> Result<bool> {
        if !self.legacy_path.is_file() {
            return Ok(false);
        }
        if self.path.is_file() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Impossible de supprimer {}", self.path.display()))?;
        }
        fs::rename(&self.legacy_path, &self.path).with_context(|| {
            format!(
                "Impossible de renommer {} en {}",
                self.legacy_path.display(),
                self.path.display()
            )
        })?;
        log::info!(
            "Configuration migrée de {} vers {}",
            self.legacy_path.display(),
            self.path.display()
        );
        Ok(true)
    }

    /// Charge le document ; un fichier absent donne un document vide.
    pub fn load(&self) -> Result<SettingsDocument> {
        if !self.path.exists() {
            return Ok(SettingsDocument::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Impossible de lire {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(SettingsDocument::default());
        }
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Format JSON invalide dans {}", self.path.display()))?;
        let Value::Object(map) = value else {
            bail!(
                "{} doit contenir un objet JSON à la racine",
                self.path.display()
            );
        };
        Ok(SettingsDocument(map))
    }

    /// Écrit le document complet.
    pub fn save(&self, doc: &SettingsDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Impossible de créer {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(doc).context("Erreur de sérialisation JSON")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Impossible d'écrire {}", self.path.display()))?;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}
