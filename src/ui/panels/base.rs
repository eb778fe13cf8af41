// =============================================================================
// Fichier : base.rs
// Rôle    : Socle commun des panneaux : widgets liés, recalcul d'état,
//           tâches de fond et dépôt de fichiers
//
// Règles :
//   - Tout changement d'un widget lié déclenche `do_update(Some(widget))`.
//   - Les changements provoqués pendant `on_update` sont ignorés (garde).
//   - Une fois le panneau fermé, plus aucun widget n'est réactivé.
// =============================================================================

use std::cell::{OnceCell, RefCell};
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::time::Duration;

use anyhow::Result;
use gtk4::prelude::*;
use gtk4::{gdk, glib};

use crate::core::components::{Component, ComponentSet};
use crate::core::panel::PanelHooks;
use crate::core::reporter::ErrorReporter;
use crate::core::update::UpdateGuard;
use crate::core::worker::{CompletedWork, WorkId, WorkSupervisor, Worker};
use crate::ui::layout::{Layout, LayoutError, LoadedLayout};

/// Période de scrutation des workers terminés.
const WORK_POLL_INTERVAL: Duration = Duration::from_millis(20);

impl Component for gtk4::Widget {
    fn set_enabled(&self, enabled: bool) {
        self.set_sensitive(enabled);
    }
}

/// Panneau affiché par la fenêtre principale.
pub trait Panel: PanelHooks {
    fn base(&self) -> &BasePanel;

    /// Titre de l'onglet.
    fn title(&self) -> &str;

    /// Recalcule l'état dérivé. `target` est le widget modifié, `None` pour
    /// un recalcul complet.
    fn on_update(&self, _target: Option<&gtk4::Widget>) {}

    /// Un worker de ce panneau vient de se terminer.
    fn on_work_stopped(&self, _work: &CompletedWork) {}
}

/// Référence faible vers un panneau, renseignée une fois le `Rc` créé.
///
/// Les gestionnaires de signaux sont connectés pendant la construction,
/// avant que le panneau n'existe ; ils la résolvent à l'exécution.
pub struct SelfRef<T: ?Sized>(Rc<OnceCell<Weak<T>>>);

impl<T: ?Sized> Clone for SelfRef<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized + 'static> SelfRef<T> {
    pub fn new() -> Self {
        Self(Rc::new(OnceCell::new()))
    }

    pub fn set(&self, weak: Weak<T>) {
        if self.0.set(weak).is_err() {
            log::warn!("Référence de panneau déjà renseignée");
        }
    }

    pub fn get(&self) -> Option<Rc<T>> {
        self.0.get().and_then(Weak::upgrade)
    }

    /// Gestionnaire de signal appelant `f` tant que le panneau existe.
    pub fn handler<A: ?Sized + 'static>(
        &self,
        f: impl Fn(&T, &A) + 'static,
    ) -> impl Fn(&A) + 'static {
        let this = self.clone();
        move |arg: &A| {
            if let Some(panel) = this.get() {
                f(&*panel, arg);
            }
        }
    }
}

impl<T: ?Sized + 'static> Default for SelfRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// État et outils partagés par tous les panneaux.
pub struct BasePanel {
    root: gtk4::Widget,
    layout: LoadedLayout,
    owner: SelfRef<dyn Panel>,
    components: ComponentSet<gtk4::Widget>,
    guard: UpdateGuard,
    work: RefCell<WorkSupervisor>,
    work_pump: RefCell<Option<glib::SourceId>>,
    drop_target: RefCell<Option<gtk4::DropTarget>>,
}

impl BasePanel {
    /// Instancie l'objet `root_name` du layout.
    pub fn new(
        layout: &Layout,
        root_name: &str,
        reporter: ErrorReporter,
    ) -> Result<Self, LayoutError> {
        let layout = layout.instantiate(root_name)?;
        let root = layout.object::<gtk4::Widget>(root_name)?;
        Ok(Self {
            root,
            layout,
            owner: SelfRef::new(),
            components: ComponentSet::default(),
            guard: UpdateGuard::default(),
            work: RefCell::new(WorkSupervisor::new(reporter)),
            work_pump: RefCell::new(None),
            drop_target: RefCell::new(None),
        })
    }

    /// Rattache le panneau concret à son socle ; à appeler juste après
    /// la création du `Rc`.
    pub fn attach<P: Panel + 'static>(panel: &Rc<P>) {
        let weak: Weak<dyn Panel> = Rc::downgrade(panel) as Weak<dyn Panel>;
        panel.base().owner.set(weak);
    }

    pub fn root(&self) -> &gtk4::Widget {
        &self.root
    }

    pub fn is_closing(&self) -> bool {
        self.components.is_closing()
    }

    // -------------------------------------------------------------------------
    // Widgets
    // -------------------------------------------------------------------------

    /// Widget nommé, non suivi.
    pub fn find<T: IsA<gtk4::Widget> + IsA<glib::Object>>(&self, name: &str) -> Result<T, LayoutError> {
        self.layout.object(name)
    }

    fn track<T: IsA<gtk4::Widget> + IsA<glib::Object>>(&self, name: &str) -> Result<T, LayoutError> {
        let widget: T = self.layout.object(name)?;
        self.components.track(widget.clone().upcast());
        Ok(widget)
    }

    fn update_handler<A: IsA<gtk4::Widget> + 'static>(&self) -> impl Fn(&A) + 'static {
        self.owner.handler(|panel: &(dyn Panel + 'static), widget: &A| {
            panel.base().do_update(Some(widget.upcast_ref::<gtk4::Widget>()));
        })
    }

    pub fn bind_combo_box(&self, name: &str) -> Result<gtk4::DropDown, LayoutError> {
        let widget: gtk4::DropDown = self.track(name)?;
        widget.connect_selected_notify(self.update_handler::<gtk4::DropDown>());
        Ok(widget)
    }

    pub fn bind_list_box(&self, name: &str) -> Result<gtk4::ListBox, LayoutError> {
        let widget: gtk4::ListBox = self.track(name)?;
        let handler = self.update_handler::<gtk4::ListBox>();
        widget.connect_row_selected(move |list, _| handler(list));
        Ok(widget)
    }

    /// Bouton radio : seule l'activation déclenche une mise à jour.
    pub fn bind_radio_button(&self, name: &str) -> Result<gtk4::CheckButton, LayoutError> {
        let widget: gtk4::CheckButton = self.track(name)?;
        let handler = self.update_handler::<gtk4::CheckButton>();
        widget.connect_toggled(move |button| {
            if button.is_active() {
                handler(button);
            }
        });
        Ok(widget)
    }

    pub fn bind_check_box(&self, name: &str) -> Result<gtk4::CheckButton, LayoutError> {
        let widget: gtk4::CheckButton = self.track(name)?;
        widget.connect_toggled(self.update_handler::<gtk4::CheckButton>());
        Ok(widget)
    }

    pub fn bind_text_ctrl(&self, name: &str) -> Result<gtk4::Entry, LayoutError> {
        let widget: gtk4::Entry = self.track(name)?;
        widget.connect_changed(self.update_handler::<gtk4::Entry>());
        Ok(widget)
    }

    pub fn bind_button(
        &self,
        name: &str,
        handler: impl Fn(&gtk4::Button) + 'static,
    ) -> Result<gtk4::Button, LayoutError> {
        let widget: gtk4::Button = self.track(name)?;
        widget.connect_clicked(handler);
        Ok(widget)
    }

    /// Widget quelconque suivi par `enable_all`/`disable_all` ; l'appelant
    /// connecte lui-même ses signaux.
    pub fn bind_window<T: IsA<gtk4::Widget> + IsA<glib::Object>>(&self, name: &str) -> Result<T, LayoutError> {
        self.track(name)
    }

    pub fn find_static_text(&self, name: &str) -> Result<gtk4::Label, LayoutError> {
        self.find(name)
    }

    pub fn find_static_bitmap(&self, name: &str) -> Result<gtk4::Picture, LayoutError> {
        self.find(name)
    }

    pub fn find_link(&self, name: &str) -> Result<gtk4::LinkButton, LayoutError> {
        self.find(name)
    }

    // -------------------------------------------------------------------------
    // État dérivé
    // -------------------------------------------------------------------------

    /// Appelle `on_update` du panneau, sauf si un recalcul est déjà en cours.
    pub fn do_update(&self, target: Option<&gtk4::Widget>) {
        let Some(panel) = self.owner.get() else {
            return;
        };
        if !self.guard.run(|| panel.on_update(target)) {
            log::trace!("Mise à jour imbriquée ignorée");
        }
    }

    /// Réactive les widgets suivis puis recalcule l'état dérivé.
    pub fn enable_all(&self) {
        self.components.enable_all(|| self.do_update(None));
    }

    pub fn disable_all(&self) {
        self.components.disable_all();
    }

    // -------------------------------------------------------------------------
    // Tâches de fond
    // -------------------------------------------------------------------------

    /// Démarre un worker ; avec `freeze_ui`, les widgets suivis restent
    /// désactivés jusqu'à sa fin.
    pub fn start_work<W: Worker>(&self, worker: W, freeze_ui: bool) -> Result<WorkId> {
        if freeze_ui {
            self.disable_all();
        }
        let started = self.work.borrow_mut().start(worker, freeze_ui);
        match started {
            Ok(id) => {
                self.ensure_work_pump();
                Ok(id)
            }
            Err(e) => {
                if freeze_ui {
                    self.enable_all();
                }
                Err(e)
            }
        }
    }

    /// Demande l'arrêt des workers de type `W` ; retourne leur nombre.
    pub fn stop_work<W: Worker>(&self) -> usize {
        self.work.borrow().stop::<W>()
    }

    pub fn is_working<W: Worker>(&self) -> bool {
        self.work.borrow().is_running::<W>()
    }

    fn ensure_work_pump(&self) {
        if self.work_pump.borrow().is_some() {
            return;
        }
        let owner = self.owner.clone();
        let id = glib::timeout_add_local(WORK_POLL_INTERVAL, move || {
            let Some(panel) = owner.get() else {
                return glib::ControlFlow::Break;
            };
            let base = panel.base();
            let done = base.work.borrow_mut().poll_completed();
            for work in &done {
                panel.on_work_stopped(work);
                base.components.work_stopped(work, || base.do_update(None));
            }
            if base.work.borrow().active_count() == 0 {
                base.work_pump.borrow_mut().take();
                return glib::ControlFlow::Break;
            }
            glib::ControlFlow::Continue
        });
        *self.work_pump.borrow_mut() = Some(id);
    }

    /// Fermeture : annule et attend tous les workers du panneau.
    pub fn close(&self) {
        self.components.close();
        if let Some(id) = self.work_pump.borrow_mut().take() {
            id.remove();
        }
        self.work.borrow_mut().shutdown();
        self.disable_file_drop();
    }

    // -------------------------------------------------------------------------
    // Dépôt de fichiers
    // -------------------------------------------------------------------------

    /// Accepte les fichiers déposés sur le panneau (transmis à `on_file_drop`).
    pub fn enable_file_drop(&self) {
        if self.drop_target.borrow().is_some() {
            return;
        }
        let target = gtk4::DropTarget::new(gdk::FileList::static_type(), gdk::DragAction::COPY);
        let owner = self.owner.clone();
        target.connect_drop(move |_, value, _, _| {
            let Ok(list) = value.get::<gdk::FileList>() else {
                return false;
            };
            let files: Vec<PathBuf> = list.files().iter().filter_map(|f| f.path()).collect();
            if files.is_empty() {
                return false;
            }
            match owner.get() {
                Some(panel) => {
                    log::debug!("{} fichier(s) déposé(s)", files.len());
                    panel.on_file_drop(&files);
                    true
                }
                None => false,
            }
        });
        self.root.add_controller(target.clone());
        *self.drop_target.borrow_mut() = Some(target);
    }

    pub fn disable_file_drop(&self) {
        if let Some(target) = self.drop_target.borrow_mut().take() {
            self.root.remove_controller(&target);
        }
    }
}
