// =============================================================================
// Fichier : update.rs
// Rôle    : Garde anti-réentrance autour des recalculs déclenchés par l'UI
// =============================================================================

use std::cell::Cell;

/// Empêche un recalcul de se déclencher pendant qu'un autre est en cours.
///
/// Un handler qui modifie lui-même un widget lié ne relance donc pas de
/// second recalcul imbriqué.
#[derive(Debug, Default)]
pub struct UpdateGuard {
    active: Cell<bool>,
}

/// Remet le drapeau à zéro, y compris en cas de panic dans le recalcul.
struct Reset<'a>(&'a Cell<bool>);

impl Drop for Reset<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl UpdateGuard {
    /// Exécute `f` sauf si un recalcul est déjà en cours.
    /// Retourne `true` si `f` a été exécuté.
    pub fn run(&self, f: impl FnOnce()) -> bool {
        if self.active.replace(true) {
            return false;
        }
        let _reset = Reset(&self.active);
        f();
        true
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}
