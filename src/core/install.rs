// =============================================================================
// Fichier : install.rs
// Rôle    : Localisation et vérification de l'installation LibreTiny
//
// Sans plateforme LibreTiny (ni snapshot local), l'application ne peut rien
// flasher : l'échec est fatal au démarrage.
// =============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::core::resources::ResourcePaths;

/// Variable d'environnement désignant explicitement la plateforme.
pub const LT_DIR_ENV: &str = "LTCHIPTOOL_LT_DIR";

/// Version minimale de la plateforme LibreTiny.
pub const MIN_PLATFORM_VERSION: Version = Version(1, 0, 0);

const PLATFORM_MANIFEST: &str = "platform.json";
const SNAPSHOT_MANIFEST: &str = "families.json";

/// Version `majeur.mineur.correctif`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u32, pub u32, pub u32);

impl Version {
    /// Accepte `1.2.3`, `v1.2`, `1.2.3-dev` (suffixe ignoré).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_start_matches('v');
        let core = text.split(['-', '+']).next()?;
        let mut parts = core.split('.').map(|p| p.parse::<u32>());
        let major = parts.next()?.ok()?;
        let minor = parts.next().unwrap_or(Ok(0)).ok()?;
        let patch = parts.next().unwrap_or(Ok(0)).ok()?;
        Some(Self(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Type d'installation trouvée.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    /// Paquet de plateforme LibreTiny (PlatformIO).
    Platform,
    /// Snapshot local des données, sans version.
    Snapshot,
}

/// Installation utilisable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub kind: InstallKind,
    pub path: PathBuf,
    pub version: Option<Version>,
}

/// Échecs de localisation de l'installation.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("LibreTiny introuvable (cherché dans : {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("manifeste invalide {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },
    #[error("LibreTiny v{found} trop ancien, v{required} minimum requis")]
    TooOld { found: Version, required: Version },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Deserialize)]
struct PlatformManifest {
    version: String,
}

impl Installation {
    /// Localise l'installation : variable d'environnement, plateforme
    /// PlatformIO, puis snapshot local fourni avec les ressources.
    pub fn require(resources: &ResourcePaths) -> Result<Self, InstallError> {
        let mut platforms = Vec::new();
        if let Some(dir) = env::var_os(LT_DIR_ENV) {
            platforms.push(PathBuf::from(dir));
        }
        if let Some(home) = dirs::home_dir() {
            platforms.push(home.join(".platformio").join("platforms").join("libretiny"));
        }
        Self::require_from(&platforms, &resources.snapshot_dir())
    }

    /// Première plateforme valide de `platforms`, sinon le snapshot.
    pub fn require_from(platforms: &[PathBuf], snapshot: &Path) -> Result<Self, InstallError> {
        for dir in platforms {
            if dir.join(PLATFORM_MANIFEST).is_file() {
                return Self::probe_platform(dir);
            }
        }
        if snapshot.join(SNAPSHOT_MANIFEST).is_file() {
            log::info!("Utilisation du snapshot local {}", snapshot.display());
            return Ok(Self {
                kind: InstallKind::Snapshot,
                path: snapshot.to_path_buf(),
                version: None,
            });
        }
        let mut searched = platforms.to_vec();
        searched.push(snapshot.to_path_buf());
        Err(InstallError::NotFound { searched })
    }

    fn probe_platform(dir: &Path) -> Result<Self, InstallError> {
        let path = dir.join(PLATFORM_MANIFEST);
        let invalid = |reason: String| InstallError::InvalidManifest {
            path: path.clone(),
            reason,
        };
        let content = fs::read_to_string(&path).map_err(|e| invalid(e.to_string()))?;
        let manifest: PlatformManifest =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        let version = Version::parse(&manifest.version)
            .ok_or_else(|| invalid(format!("version illisible '{}'", manifest.version)))?;
        if version < MIN_PLATFORM_VERSION {
            return Err(InstallError::TooOld {
                found: version,
                required: MIN_PLATFORM_VERSION,
            });
        }
        log::info!("LibreTiny v{version} trouvé dans {}", dir.display());
        Ok(Self {
            kind: InstallKind::Platform,
            path: dir.to_path_buf(),
            version: Some(version),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(dir: &Path, version: &str) -> PathBuf {
        let path = dir.join("libretiny");
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join(PLATFORM_MANIFEST),
            format!(r#"{{"name": "libretiny", "version": "{version}"}}"#),
        )
        .unwrap();
        path
    }

    #[test]
    fn versions_parse_loosely() {
        assert_eq!(Version::parse("1.5.1"), Some(Version(1, 5, 1)));
        assert_eq!(Version::parse("v2.0"), Some(Version(2, 0, 0)));
        assert_eq!(Version::parse("1.4.0-dev+abc"), Some(Version(1, 4, 0)));
        assert_eq!(Version::parse("latest"), None);
        assert!(Version(1, 10, 0) > Version(1, 9, 9));
    }

    #[test]
    fn platform_is_preferred_over_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let lt = platform(dir.path(), "1.5.1");
        let snapshot = dir.path().join("snapshot");
        fs::create_dir(&snapshot).unwrap();
        fs::write(snapshot.join(SNAPSHOT_MANIFEST), "{}").unwrap();

        let install = Installation::require_from(&[dir.path().join("absent"), lt.clone()], &snapshot)
            .unwrap();
        assert_eq!(install.kind, InstallKind::Platform);
        assert_eq!(install.path, lt);
        assert_eq!(install.version, Some(Version(1, 5, 1)));
    }

    #[test]
    fn snapshot_is_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SNAPSHOT_MANIFEST), "{}").unwrap();
        let install = Installation::require_from(&[], dir.path()).unwrap();
        assert_eq!(install.kind, InstallKind::Snapshot);
        assert_eq!(install.version, None);
    }

    #[test]
    fn missing_or_outdated_installation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Installation::require_from(&[], &dir.path().join("snapshot")).unwrap_err();
        assert!(matches!(err, InstallError::NotFound { ref searched } if searched.len() == 1));

        let old = platform(dir.path(), "0.9.2");
        let err = Installation::require_from(&[old], dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "LibreTiny v0.9.2 trop ancien, v1.0.0 minimum requis");
    }
}
