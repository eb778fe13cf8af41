// =============================================================================
// Fichier : components.rs
// Rôle    : Widgets suivis d'un panneau : gel pendant une tâche de fond,
//           réactivation à sa fin, verrou de fermeture
//
// Règles :
//   - Une tâche `freeze_ui` désactive tout au démarrage et réactive tout,
//     une seule fois, à sa fin.
//   - Chaque réactivation est suivie d'un unique recalcul d'état.
//   - Après `close()`, plus rien n'est activé ni désactivé.
// =============================================================================

use std::cell::{Cell, RefCell};

use crate::core::worker::CompletedWork;

/// Élément d'interface activable.
pub trait Component {
    fn set_enabled(&self, enabled: bool);
}

/// Ensemble des composants suivis par un panneau.
#[derive(Debug)]
pub struct ComponentSet<C> {
    items: RefCell<Vec<C>>,
    closing: Cell<bool>,
}

impl<C> Default for ComponentSet<C> {
    fn default() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
            closing: Cell::new(false),
        }
    }
}

impl<C: Component> ComponentSet<C> {
    pub fn track(&self, component: C) {
        self.items.borrow_mut().push(component);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.get()
    }

    pub fn close(&self) {
        self.closing.set(true);
    }

    /// Réactive tout puis appelle `update`. Retourne `false` après fermeture.
    pub fn enable_all(&self, update: impl FnOnce()) -> bool {
        if self.set_all(true) {
            update();
            true
        } else {
            false
        }
    }

    pub fn disable_all(&self) -> bool {
        self.set_all(false)
    }

    /// Une tâche s'est terminée. Retourne `true` si l'UI a été réactivée.
    pub fn work_stopped(&self, work: &CompletedWork, update: impl FnOnce()) -> bool {
        work.freeze_ui && self.enable_all(update)
    }

    fn set_all(&self, enabled: bool) -> bool {
        if self.closing.get() {
            return false;
        }
        for component in self.items.borrow().iter() {
            component.set_enabled(enabled);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reporter::ErrorReporter;
    use crate::core::worker::{WorkOutcome, WorkSupervisor, Worker};
    use anyhow::Result;
    use std::rc::Rc;
    use std::thread;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    /// Garde l'historique des changements d'état.
    #[derive(Clone, Default)]
    struct FakeWidget {
        history: Rc<RefCell<Vec<bool>>>,
    }

    impl Component for FakeWidget {
        fn set_enabled(&self, enabled: bool) {
            self.history.borrow_mut().push(enabled);
        }
    }

    struct Quick;

    impl Worker for Quick {
        fn name(&self) -> &str {
            "quick"
        }

        fn run(&mut self, _cancel: &CancellationToken) -> Result<()> {
            Ok(())
        }
    }

    fn tracked(count: usize) -> (ComponentSet<FakeWidget>, Vec<FakeWidget>) {
        let set = ComponentSet::default();
        let widgets: Vec<FakeWidget> = (0..count).map(|_| FakeWidget::default()).collect();
        for widget in &widgets {
            set.track(widget.clone());
        }
        (set, widgets)
    }

    fn wait_completed(sup: &mut WorkSupervisor) -> Vec<CompletedWork> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let done = sup.poll_completed();
            if !done.is_empty() || Instant::now() >= deadline {
                return done;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn frozen_widgets_are_enabled_once_when_work_stops() {
        let (set, widgets) = tracked(2);
        let mut sup = WorkSupervisor::new(ErrorReporter::new());
        let updates = Cell::new(0);

        set.disable_all();
        sup.start(Quick, true).unwrap();
        for widget in &widgets {
            assert_eq!(*widget.history.borrow(), vec![false]);
        }

        let done = wait_completed(&mut sup);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].outcome, WorkOutcome::Finished);
        for work in &done {
            assert!(set.work_stopped(work, || updates.set(updates.get() + 1)));
        }
        thread::sleep(Duration::from_millis(20));
        for work in sup.poll_completed() {
            set.work_stopped(&work, || updates.set(updates.get() + 1));
        }

        for widget in &widgets {
            assert_eq!(*widget.history.borrow(), vec![false, true]);
        }
        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn background_work_leaves_widgets_alone() {
        let (set, widgets) = tracked(1);
        let mut sup = WorkSupervisor::new(ErrorReporter::new());

        sup.start(Quick, false).unwrap();
        let done = wait_completed(&mut sup);
        assert_eq!(done.len(), 1);
        assert!(!set.work_stopped(&done[0], || panic!("aucun recalcul attendu")));
        assert!(widgets[0].history.borrow().is_empty());
    }

    #[test]
    fn enable_all_triggers_exactly_one_update() {
        let (set, widgets) = tracked(3);
        let updates = Cell::new(0);
        assert!(set.enable_all(|| updates.set(updates.get() + 1)));
        assert_eq!(updates.get(), 1);
        assert!(widgets.iter().all(|w| *w.history.borrow() == vec![true]));
    }

    #[test]
    fn nothing_changes_once_closing() {
        let (set, widgets) = tracked(2);
        let mut sup = WorkSupervisor::new(ErrorReporter::new());

        set.disable_all();
        sup.start(Quick, true).unwrap();
        let done = wait_completed(&mut sup);
        set.close();
        assert!(set.is_closing());

        assert!(!set.work_stopped(&done[0], || panic!("aucun recalcul attendu")));
        assert!(!set.disable_all());
        assert!(!set.enable_all(|| panic!("aucun recalcul attendu")));
        for widget in &widgets {
            assert_eq!(*widget.history.borrow(), vec![false]);
        }
    }
}
