// =============================================================================
// Fichier : session.rs
// Rôle    : Cycle de vie de la fenêtre principale et de ses panneaux
//
//   Unloaded → Loading → Loaded → Closing → Destroyed
//
// - `Loaded` n'est atteint qu'après le montage d'au moins un onglet.
// - Les paramètres ne sont sauvegardés que depuis `Loaded` : une fenêtre
//   incomplète n'écrase jamais une configuration valide.
// - À l'affichage, tous les panneaux reçoivent leurs paramètres avant que
//   le premier `on_show` ne soit appelé.
// - `on_activate`/`on_deactivate` ne sont appelés qu'entre l'affichage et
//   la fermeture.
// =============================================================================

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::Value;

use crate::core::panel::{FrameWindow, InitParams, PanelHooks};
use crate::core::registry::{PanelRegistry, RegistryError};
use crate::core::reporter::ErrorReporter;
use crate::core::settings::{PanelSettings, SettingsDocument, SettingsStore};

/// État de la fenêtre principale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Unloaded,
    Loading,
    Loaded,
    Closing,
    Destroyed,
}

/// Résultat de la fermeture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Fenêtre incomplète ou déjà fermée : rien n'a été écrit.
    Discarded,
    /// Paramètres écrits dans ce fichier.
    Saved(PathBuf),
    /// L'écriture a échoué (erreur signalée).
    Failed,
}

/// Orchestration des panneaux montés dans la fenêtre principale.
pub struct Session<P: ?Sized + PanelHooks> {
    store: SettingsStore,
    reporter: ErrorReporter,
    registry: RefCell<PanelRegistry<P>>,
    state: Cell<FrameState>,
    shown: Cell<bool>,
    /// Onglet actif, suivi même avant l'affichage.
    active: RefCell<Option<String>>,
    tabs_live: Cell<bool>,
}

impl<P: ?Sized + PanelHooks> Session<P> {
    pub fn new(store: SettingsStore, reporter: ErrorReporter) -> Self {
        Self {
            store,
            reporter,
            registry: RefCell::new(PanelRegistry::new()),
            state: Cell::new(FrameState::Unloaded),
            shown: Cell::new(false),
            active: RefCell::new(None),
            tabs_live: Cell::new(false),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> FrameState {
        self.state.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.get() == FrameState::Loaded
    }

    #[cfg(test)]
    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn begin_loading(&self) {
        if self.state.get() == FrameState::Unloaded {
            self.state.set(FrameState::Loading);
        }
    }

    /// Monte un panneau hors onglets (panneau de log) : ne compte pas pour `Loaded`.
    pub fn mount_permanent(&self, id: &str, panel: Rc<P>) -> Result<(), RegistryError> {
        self.registry.borrow_mut().insert(id, panel)
    }

    /// Monte un onglet ; le premier montage réussi fait passer en `Loaded`.
    pub fn mount(&self, id: &str, panel: Rc<P>) -> Result<(), RegistryError> {
        self.registry.borrow_mut().insert(id, panel)?;
        if self.state.get() == FrameState::Loading {
            self.state.set(FrameState::Loaded);
        }
        log::debug!("Panneau '{id}' monté");
        Ok(())
    }

    /// Signale l'échec de construction de `name`.
    ///
    /// Retourne `true` si aucun onglet n'est encore monté : la fenêtre est
    /// inutilisable et doit être fermée.
    pub fn build_failed(&self, name: &str, err: &anyhow::Error) -> bool {
        self.reporter
            .report(err, Some(&format!("Impossible de construire {name}")));
        !self.is_loaded()
    }

    /// Copie de la liste des panneaux (aucun emprunt gardé pendant les appels).
    pub fn panels(&self) -> Vec<(String, Rc<P>)> {
        self.registry
            .borrow()
            .iter()
            .map(|(id, panel)| (id.to_string(), panel.clone()))
            .collect()
    }

    pub fn panel(&self, id: &str) -> Option<Rc<P>> {
        self.registry.borrow().get(id).cloned()
    }

    /// Premier identifiant dont le panneau satisfait `pred`.
    pub fn find_id(&self, pred: impl Fn(&P) -> bool) -> Option<String> {
        let registry = self.registry.borrow();
        for (id, panel) in registry.iter() {
            if pred(&**panel) {
                return Some(id.to_string());
            }
        }
        None
    }

    #[cfg(test)]
    pub fn panel_ids(&self) -> Vec<String> {
        self.registry
            .borrow()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Premier affichage : applique les paramètres puis déclenche `on_show`.
    /// Retourne `false` si la fenêtre a déjà été affichée.
    pub fn show<W: FrameWindow + ?Sized>(&self, window: &W, params: &InitParams) -> bool {
        if self.shown.replace(true) || self.state.get() == FrameState::Destroyed {
            return false;
        }

        let doc = match self.store.load() {
            Ok(doc) => doc,
            Err(e) => {
                self.reporter.report(
                    &e,
                    Some("Paramètres illisibles, valeurs par défaut utilisées"),
                );
                SettingsDocument::default()
            }
        };

        window.apply_main_settings(&doc.main());

        let panels = self.panels();
        let empty = PanelSettings::new();
        for (id, panel) in &panels {
            panel.set_settings(doc.panel(id).unwrap_or(&empty));
            panel.set_init_params(params);
        }
        if !doc.is_empty() {
            log::info!("Paramètres chargés depuis {}", self.store.path().display());
        }

        for (_, panel) in &panels {
            panel.on_show();
        }

        self.tabs_live.set(true);
        let active = self.active.borrow().clone();
        if let Some(panel) = active.and_then(|id| self.panel(&id)) {
            panel.on_activate();
        }
        true
    }

    /// Changement d'onglet : `id` est le panneau du nouvel onglet actif,
    /// `None` s'il n'appartient à aucun panneau monté.
    pub fn activate(&self, id: Option<&str>) {
        let previous = self.active.replace(id.map(str::to_string));
        if previous.as_deref() == id || !self.tabs_live.get() {
            return;
        }
        if let Some(panel) = previous.and_then(|prev| self.panel(&prev)) {
            panel.on_deactivate();
        }
        if let Some((id, panel)) = id.and_then(|id| Some((id, self.panel(id)?))) {
            log::debug!("Onglet '{id}' actif");
            panel.on_activate();
        }
    }

    /// Fermeture : arrête les panneaux et persiste leurs paramètres.
    pub fn close<W: FrameWindow + ?Sized>(&self, window: &W) -> CloseOutcome {
        match self.state.get() {
            FrameState::Loaded => {}
            FrameState::Closing | FrameState::Destroyed => return CloseOutcome::Discarded,
            FrameState::Unloaded | FrameState::Loading => {
                log::warn!("Fenêtre incomplète : paramètres non sauvegardés");
                self.state.set(FrameState::Destroyed);
                return CloseOutcome::Discarded;
            }
        }
        self.state.set(FrameState::Closing);
        self.tabs_live.set(false);

        let mut doc = match self.store.load() {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Paramètres existants illisibles, ils seront remplacés : {e:#}");
                SettingsDocument::default()
            }
        };

        doc.set_main(&window.main_settings());
        for (id, panel) in self.panels() {
            panel.on_close();
            doc.set_panel(&id, panel.settings());
        }

        let outcome = match self.store.save(&doc) {
            Ok(()) => {
                log::info!("Paramètres sauvegardés dans {}", self.store.path().display());
                CloseOutcome::Saved(self.store.path().to_path_buf())
            }
            Err(e) => {
                self.reporter
                    .report(&e, Some("Impossible de sauvegarder les paramètres"));
                CloseOutcome::Failed
            }
        };
        self.state.set(FrameState::Destroyed);
        outcome
    }

    /// Journalise les paramètres courants sans les persister.
    pub fn print_settings<W: FrameWindow + ?Sized>(&self, window: &W) {
        log::debug!("Paramètres principaux : {:?}", window.main_settings());
        for (id, panel) in self.panels() {
            log::debug!(
                "Paramètres du panneau '{id}' : {}",
                Value::Object(panel.settings())
            );
        }
    }

    /// Transmet une entrée de menu non interprétée à tous les panneaux.
    pub fn forward_menu(&self, title: &str, label: &str, checked: bool) {
        for (_, panel) in self.panels() {
            panel.on_menu(title, label, checked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::MainSettings;
    use anyhow::anyhow;
    use serde_json::json;
    use std::fs;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct FakePanel {
        name: &'static str,
        journal: Journal,
        value: RefCell<Option<Value>>,
        params: RefCell<Option<InitParams>>,
    }

    impl FakePanel {
        fn new(name: &'static str, journal: &Journal) -> Rc<Self> {
            Rc::new(Self {
                name,
                journal: journal.clone(),
                value: RefCell::new(None),
                params: RefCell::new(None),
            })
        }

        fn log(&self, event: &str) {
            self.journal.borrow_mut().push(format!("{}:{event}", self.name));
        }
    }

    impl PanelHooks for FakePanel {
        fn set_init_params(&self, params: &InitParams) {
            *self.params.borrow_mut() = Some(params.clone());
        }

        fn settings(&self) -> PanelSettings {
            self.log("settings");
            let mut map = PanelSettings::new();
            if let Some(value) = self.value.borrow().clone() {
                map.insert("value".into(), value);
            }
            map
        }

        fn set_settings(&self, settings: &PanelSettings) {
            self.log("set_settings");
            *self.value.borrow_mut() = settings.get("value").cloned();
        }

        fn on_show(&self) {
            self.log("on_show");
        }

        fn on_close(&self) {
            self.log("on_close");
        }

        fn on_menu(&self, title: &str, label: &str, checked: bool) {
            self.log(&format!("menu {title}/{label}/{checked}"));
        }

        fn on_activate(&self) {
            self.log("on_activate");
        }

        fn on_deactivate(&self) {
            self.log("on_deactivate");
        }
    }

    struct FakeWindow {
        pages: Vec<&'static str>,
        current: RefCell<MainSettings>,
    }

    impl FakeWindow {
        fn new() -> Self {
            Self {
                pages: vec!["flash", "about"],
                current: RefCell::new(MainSettings {
                    pos: Some((0, 0)),
                    size: Some((700, 800)),
                    page: Some("flash".into()),
                }),
            }
        }
    }

    impl FrameWindow for FakeWindow {
        fn main_settings(&self) -> MainSettings {
            self.current.borrow().clone()
        }

        fn apply_main_settings(&self, settings: &MainSettings) {
            let mut current = self.current.borrow_mut();
            if let Some(pos) = settings.pos {
                current.pos = Some(pos);
            }
            if let Some(size) = settings.size {
                current.size = Some(size);
            }
            if let Some(page) = &settings.page {
                if self.pages.iter().any(|p| *p == page.as_str()) {
                    current.page = Some(page.clone());
                }
            }
        }
    }

    fn loaded_session(
        dir: &std::path::Path,
        journal: &Journal,
    ) -> (Session<dyn PanelHooks>, Rc<FakePanel>, Rc<FakePanel>) {
        let session: Session<dyn PanelHooks> =
            Session::new(SettingsStore::in_dir(dir), ErrorReporter::new());
        session.begin_loading();
        let log = FakePanel::new("log", journal);
        let flash = FakePanel::new("flash", journal);
        session.mount_permanent("log", log.clone()).unwrap();
        assert_eq!(session.state(), FrameState::Loading);
        session.mount("flash", flash.clone()).unwrap();
        assert_eq!(session.state(), FrameState::Loaded);
        (session, log, flash)
    }

    #[test]
    fn all_panels_receive_settings_before_any_on_show() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("gui.json"),
            r#"{"log": {"value": 1}, "flash": {"value": "x"}}"#,
        )
        .unwrap();
        let journal = Journal::default();
        let (session, log, flash) = loaded_session(dir.path(), &journal);
        let params = InitParams {
            file: Some("fw.uf2".into()),
        };

        assert!(session.show(&FakeWindow::new(), &params));

        assert_eq!(
            *journal.borrow(),
            vec!["log:set_settings", "flash:set_settings", "log:on_show", "flash:on_show"]
        );
        assert_eq!(*log.value.borrow(), Some(json!(1)));
        assert_eq!(*flash.value.borrow(), Some(json!("x")));
        assert_eq!(*flash.params.borrow(), Some(params.clone()));
        // Un seul affichage.
        assert!(!session.show(&FakeWindow::new(), &params));
    }

    #[test]
    fn main_slice_positions_window_and_selects_page() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("gui.json"),
            r#"{"main": {"pos": [10, 20], "size": [700, 800], "page": "about"}}"#,
        )
        .unwrap();
        let journal = Journal::default();
        let (session, _, _) = loaded_session(dir.path(), &journal);
        let window = FakeWindow::new();

        session.show(&window, &InitParams::default());

        assert_eq!(
            window.main_settings(),
            MainSettings {
                pos: Some((10, 20)),
                size: Some((700, 800)),
                page: Some("about".into()),
            }
        );
    }

    #[test]
    fn unknown_page_is_ignored() {
        let window = FakeWindow::new();
        window.apply_main_settings(&MainSettings {
            page: Some("plugin.missing.gui".into()),
            ..MainSettings::default()
        });
        assert_eq!(window.main_settings().page.as_deref(), Some("flash"));
    }

    #[test]
    fn close_collects_each_panel_after_stopping_it() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gui.json"), r#"{"other": {"keep": true}}"#).unwrap();
        let journal = Journal::default();
        let (session, _, flash) = loaded_session(dir.path(), &journal);
        *flash.value.borrow_mut() = Some(json!("/dev/ttyUSB0"));

        let outcome = session.close(&FakeWindow::new());

        assert_eq!(outcome, CloseOutcome::Saved(dir.path().join("gui.json")));
        assert_eq!(session.state(), FrameState::Destroyed);
        assert_eq!(
            *journal.borrow(),
            vec!["log:on_close", "log:settings", "flash:on_close", "flash:settings"]
        );
        let saved: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("gui.json")).unwrap())
                .unwrap();
        assert_eq!(saved["flash"], json!({"value": "/dev/ttyUSB0"}));
        assert_eq!(saved["log"], json!({}));
        assert_eq!(saved["other"], json!({"keep": true}));
        assert_eq!(saved["main"]["size"], json!([700, 800]));
        // Une seconde fermeture n'écrit plus rien.
        assert_eq!(session.close(&FakeWindow::new()), CloseOutcome::Discarded);
    }

    #[test]
    fn failed_startup_never_writes_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gui.json");
        let previous = r#"{"flash": {"value": "précieux"}}"#;
        fs::write(&path, previous).unwrap();

        let journal = Journal::default();
        let session: Session<dyn PanelHooks> =
            Session::new(SettingsStore::in_dir(dir.path()), ErrorReporter::new());
        session.begin_loading();
        session
            .mount_permanent("log", FakePanel::new("log", &journal))
            .unwrap();
        assert!(session.build_failed("flash", &anyhow!("layout introuvable")));

        assert_eq!(session.close(&FakeWindow::new()), CloseOutcome::Discarded);
        assert_eq!(fs::read_to_string(&path).unwrap(), previous);
        assert!(journal.borrow().is_empty());

        // Sans fichier préalable, aucun fichier n'est créé.
        let empty = tempfile::tempdir().unwrap();
        let session: Session<dyn PanelHooks> =
            Session::new(SettingsStore::in_dir(empty.path()), ErrorReporter::new());
        assert_eq!(session.close(&FakeWindow::new()), CloseOutcome::Discarded);
        assert!(!empty.path().join("gui.json").exists());
    }

    #[test]
    fn build_failure_after_first_tab_keeps_window() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let (session, _, _) = loaded_session(dir.path(), &journal);
        assert!(!session.build_failed("plugin.demo.settings", &anyhow!("boom")));
        assert!(session.is_loaded());
    }

    #[test]
    fn main_settings_round_trip_through_show_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let original = MainSettings {
            pos: Some((33, 44)),
            size: Some((640, 720)),
            page: Some("about".into()),
        };
        let mut doc = SettingsDocument::default();
        doc.set_main(&original);
        let store = SettingsStore::in_dir(dir.path());
        store.save(&doc).unwrap();

        let journal = Journal::default();
        let (session, _, _) = loaded_session(dir.path(), &journal);
        let window = FakeWindow::new();
        session.show(&window, &InitParams::default());
        session.close(&window);

        assert_eq!(store.load().unwrap().main(), original);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults_and_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gui.json"), "{ corrompu").unwrap();
        let reporter = ErrorReporter::new();
        let reports = reporter.subscribe();
        let journal = Journal::default();
        let session: Session<dyn PanelHooks> =
            Session::new(SettingsStore::in_dir(dir.path()), reporter);
        session.begin_loading();
        session.mount("flash", FakePanel::new("flash", &journal)).unwrap();

        assert!(session.show(&FakeWindow::new(), &InitParams::default()));
        assert!(reports.try_recv().is_ok());

        assert!(matches!(session.close(&FakeWindow::new()), CloseOutcome::Saved(_)));
        assert!(session.store().load().is_ok());
    }

    #[test]
    fn menu_entries_reach_every_panel() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let (session, _, _) = loaded_session(dir.path(), &journal);
        session.forward_menu("Log", "Auto-scroll", true);
        assert_eq!(
            *journal.borrow(),
            vec!["log:menu Log/Auto-scroll/true", "flash:menu Log/Auto-scroll/true"]
        );
    }

    #[test]
    fn duplicate_panel_is_not_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let (session, _, flash) = loaded_session(dir.path(), &journal);
        let err = session
            .mount("flash", FakePanel::new("flash-bis", &journal))
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("flash".into()));
        let mounted = session.panel("flash").unwrap();
        assert!(Rc::ptr_eq(&(flash as Rc<dyn PanelHooks>), &mounted));
        assert_eq!(session.panel_ids(), vec!["log", "flash"]);
    }

    #[test]
    fn tab_switches_reach_old_and_new_panels() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let (session, _, _) = loaded_session(dir.path(), &journal);
        session.mount("about", FakePanel::new("about", &journal)).unwrap();

        // Avant l'affichage, l'onglet actif est seulement mémorisé.
        session.activate(Some("flash"));
        assert!(journal.borrow().is_empty());

        session.show(&FakeWindow::new(), &InitParams::default());
        assert_eq!(journal.borrow().last().map(String::as_str), Some("flash:on_activate"));
        journal.borrow_mut().clear();

        session.activate(Some("about"));
        session.activate(Some("about"));
        session.activate(None);
        assert_eq!(
            *journal.borrow(),
            vec!["flash:on_deactivate", "about:on_activate", "about:on_deactivate"]
        );

        journal.borrow_mut().clear();
        session.close(&FakeWindow::new());
        session.activate(Some("flash"));
        assert!(!journal.borrow().iter().any(|e| e.ends_with("activate")));
    }
}
