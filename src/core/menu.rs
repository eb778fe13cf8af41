// =============================================================================
// Fichier : menu.rs
// Rôle    : Routage typé des commandes de la barre de menu
//
// Chaque entrée du menu décrit dans le layout reçoit un `CommandId` à
// l'enregistrement ; l'UI ne manipule ensuite que cet identifiant.
// =============================================================================

use std::fmt;

/// Identifiant d'une entrée de menu enregistrée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(u32);

impl CommandId {
    #[cfg(test)]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

/// Commande interprétée par la fenêtre principale elle-même.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    /// Fichier → Quitter
    Quit,
    /// Débogage → Afficher les paramètres
    PrintSettings,
}

impl BuiltinCommand {
    fn from_labels(title: &str, label: &str) -> Option<Self> {
        match (title, label) {
            ("File", "Quit") => Some(Self::Quit),
            ("Debug", "Print settings") => Some(Self::PrintSettings),
            _ => None,
        }
    }
}

/// Entrée de menu enregistrée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub title: String,
    pub label: String,
    pub checkable: bool,
    pub builtin: Option<BuiltinCommand>,
}

impl MenuEntry {
    /// Vrai pour l'entrée cochable `title/label` (mnémoniques ignorées).
    pub fn is_checkable(&self, title: &str, label: &str) -> bool {
        self.checkable && self.title == strip_mnemonic(title) && self.label == strip_mnemonic(label)
    }
}

/// Action à exécuter suite à l'activation d'une entrée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Quit,
    PrintSettings,
    /// Transmise telle quelle à tous les panneaux.
    Forward {
        title: String,
        label: String,
        checked: bool,
    },
}

/// Retire les marqueurs de mnémonique (`_Fichier` → `Fichier`, `__` → `_`).
pub fn strip_mnemonic(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            if chars.peek() == Some(&'_') {
                out.push('_');
                chars.next();
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// Table des entrées de menu.
#[derive(Debug, Default)]
pub struct MenuRouter {
    entries: Vec<MenuEntry>,
}

impl MenuRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre une entrée `(titre du menu, libellé)`.
    pub fn register(&mut self, title: &str, label: &str, checkable: bool) -> CommandId {
        let title = strip_mnemonic(title);
        let label = strip_mnemonic(label);
        let builtin = BuiltinCommand::from_labels(&title, &label);
        let id = CommandId(u32::try_from(self.entries.len()).unwrap_or(u32::MAX));
        self.entries.push(MenuEntry {
            title,
            label,
            checkable,
            builtin,
        });
        id
    }

    pub fn entry(&self, id: CommandId) -> Option<&MenuEntry> {
        self.entries.get(id.0 as usize)
    }

    /// Résout une activation. `None` pour un identifiant inconnu (activation
    /// parasite, ne provenant pas d'un menu enregistré).
    pub fn resolve(&self, id: CommandId, checked: bool) -> Option<MenuAction> {
        let entry = self.entry(id)?;
        Some(match entry.builtin {
            Some(BuiltinCommand::Quit) => MenuAction::Quit,
            Some(BuiltinCommand::PrintSettings) => MenuAction::PrintSettings,
            None => MenuAction::Forward {
                title: entry.title.clone(),
                label: entry.label.clone(),
                checked: entry.checkable && checked,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_commands_are_recognized_after_mnemonic_stripping() {
        let mut router = MenuRouter::new();
        let quit = router.register("_File", "_Quit", false);
        let print = router.register("_Debug", "Print settings", false);

        assert_eq!(router.resolve(quit, false), Some(MenuAction::Quit));
        assert_eq!(router.resolve(print, true), Some(MenuAction::PrintSettings));
    }

    #[test]
    fn other_entries_are_forwarded_with_checked_state() {
        let mut router = MenuRouter::new();
        let clear = router.register("Log", "Clear", false);
        let scroll = router.register("Log", "Auto-scroll", true);

        assert_eq!(
            router.resolve(clear, true),
            Some(MenuAction::Forward {
                title: "Log".into(),
                label: "Clear".into(),
                checked: false,
            })
        );
        assert_eq!(
            router.resolve(scroll, true),
            Some(MenuAction::Forward {
                title: "Log".into(),
                label: "Auto-scroll".into(),
                checked: true,
            })
        );
    }

    #[test]
    fn checkable_entries_are_found_by_labels() {
        let mut router = MenuRouter::new();
        let clear = router.register("_Log", "_Clear", false);
        let scroll = router.register("_Log", "_Auto-scroll", true);

        let scroll = router.entry(scroll).unwrap();
        assert!(scroll.is_checkable("Log", "Auto-scroll"));
        assert!(scroll.is_checkable("_Log", "_Auto-scroll"));
        assert!(!scroll.is_checkable("Log", "Clear"));
        assert!(!router.entry(clear).unwrap().is_checkable("Log", "Clear"));
    }

    #[test]
    fn unknown_id_is_ignored() {
        let mut router = MenuRouter::new();
        router.register("File", "Quit", false);
        assert_eq!(router.resolve(CommandId::from_raw(42), false), None);
    }

    #[test]
    fn mnemonic_stripping_keeps_escaped_underscores() {
        assert_eq!(strip_mnemonic("_Flash"), "Flash");
        assert_eq!(strip_mnemonic("snake__case"), "snake_case");
        assert_eq!(strip_mnemonic("Print settings"), "Print settings");
    }
}
