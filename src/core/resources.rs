// =============================================================================
// Fichier : resources.rs
// Rôle    : Résolution des ressources (layout, icône, snapshot) selon que
//           l'application tourne depuis un paquet ou depuis les sources
// =============================================================================

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Variable d'environnement forçant le répertoire des ressources.
pub const RESOURCES_ENV: &str = "LTCHIPTOOL_RESOURCES";

const LAYOUT_FILE: &str = "ltchiptool.ui";
const ICON_FILE: &str = "ltchiptool.svg";
const BUILD_DATE_FILE: &str = "ltchiptool.txt";
const SNAPSHOT_DIR: &str = "snapshot";

/// Emplacement des ressources de l'interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    root: PathBuf,
    bundled: bool,
}

impl ResourcePaths {
    /// Ordre de recherche : variable d'environnement, paquet
    /// (`<exe>/resources`), puis arborescence des sources.
    pub fn resolve() -> Self {
        if let Some(dir) = env::var_os(RESOURCES_ENV) {
            return Self {
                root: PathBuf::from(dir),
                bundled: true,
            };
        }
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::resolve_from(
            exe_dir.as_deref(),
            Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/resources")),
        )
    }

    /// Choisit le paquet si son répertoire contient le layout.
    pub fn resolve_from(exe_dir: Option<&Path>, dev_dir: &Path) -> Self {
        if let Some(bundle) = exe_dir.map(|dir| dir.join("resources")) {
            if bundle.join(LAYOUT_FILE).is_file() {
                return Self {
                    root: bundle,
                    bundled: true,
                };
            }
        }
        Self {
            root: dev_dir.to_path_buf(),
            bundled: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vrai quand l'application tourne depuis un paquet.
    pub const fn is_bundled(&self) -> bool {
        self.bundled
    }

    pub fn layout(&self) -> PathBuf {
        self.root.join(LAYOUT_FILE)
    }

    pub fn icon(&self) -> PathBuf {
        self.root.join(ICON_FILE)
    }

    /// Logo affiché dans le panneau « À propos ».
    pub fn logo(&self) -> PathBuf {
        self.icon()
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.join(SNAPSHOT_DIR)
    }

    /// Date de compilation, uniquement fournie par les paquets.
    pub fn build_date(&self) -> Option<String> {
        if !self.bundled {
            return None;
        }
        fs::read_to_string(self.root.join(BUILD_DATE_FILE))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_wins_when_it_has_a_layout() {
        let exe = tempfile::tempdir().unwrap();
        let dev = tempfile::tempdir().unwrap();
        fs::create_dir(exe.path().join("resources")).unwrap();
        fs::write(exe.path().join("resources").join(LAYOUT_FILE), "<interface/>").unwrap();
        fs::write(exe.path().join("resources").join(BUILD_DATE_FILE), "2024-05-01\n").unwrap();

        let paths = ResourcePaths::resolve_from(Some(exe.path()), dev.path());
        assert!(paths.is_bundled());
        assert_eq!(paths.layout(), exe.path().join("resources").join(LAYOUT_FILE));
        assert_eq!(paths.build_date().as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn source_tree_is_used_otherwise() {
        let exe = tempfile::tempdir().unwrap();
        let dev = tempfile::tempdir().unwrap();
        fs::write(dev.path().join(BUILD_DATE_FILE), "ignoré").unwrap();

        let paths = ResourcePaths::resolve_from(Some(exe.path()), dev.path());
        assert!(!paths.is_bundled());
        assert_eq!(paths.root(), dev.path());
        assert_eq!(paths.build_date(), None);
        assert_eq!(paths.snapshot_dir(), dev.path().join(SNAPSHOT_DIR));
    }
}
