// =============================================================================
// Fichier : main_frame.rs
// Rôle    : Fenêtre principale : onglets, panneau de log, menu, cycle de vie
// =============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{gio, glib, Box as GtkBox, Notebook, Orientation, Paned};
use libadwaita::prelude::*;
use thiserror::Error;

use crate::core::install::{InstallError, Installation};
use crate::core::logger::LogLine;
use crate::core::menu::{CommandId, MenuAction, MenuRouter};
use crate::core::panel::{FrameWindow, InitParams};
use crate::core::registry::{ABOUT_PANEL, FLASH_PANEL, LOG_PANEL};
use crate::core::reporter::ErrorReporter;
use crate::core::resources::ResourcePaths;
use crate::core::session::{CloseOutcome, Session};
use crate::core::settings::{MainSettings, SettingsStore};
use crate::ui::dialogs::show_error_reports;
use crate::ui::layout::{Layout, LayoutError};
use crate::ui::menu_bar::{self, MenuChecks};
use crate::ui::panels::about_panel::AboutPanel;
use crate::ui::panels::flash_panel::FlashPanel;
use crate::ui::panels::log_panel::LogPanel;
use crate::ui::panels::{Panel, PanelContext};
use crate::ui::plugins::{self, GuiElement};

const DEFAULT_SIZE: (i32, i32) = (700, 800);
const MIN_SIZE: (i32, i32) = (600, 700);
const MENU_MODEL: &str = "main_menubar";
const ICON_NAME: &str = "ltchiptool";

/// Échecs empêchant toute ouverture de fenêtre.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Tout ce que `main` prépare avant la création de la fenêtre.
pub struct Startup {
    pub reporter: ErrorReporter,
    pub log_lines: async_channel::Receiver<LogLine>,
    pub init_params: InitParams,
    pub resources: ResourcePaths,
}

/// Fenêtre principale de ltchiptool.
pub struct MainFrame {
    pub window: libadwaita::ApplicationWindow,
    notebook: Notebook,
    session: Session<dyn Panel>,
    menu: RefCell<MenuRouter>,
    init_params: InitParams,
    /// GTK 4 ne permet pas de positionner une fenêtre : la position lue
    /// dans les paramètres est conservée telle quelle.
    last_pos: Cell<Option<(i32, i32)>>,
}

impl MainFrame {
    /// Construit la fenêtre, monte les panneaux puis l'affiche.
    ///
    /// Une installation introuvable ou un layout illisible est fatal : aucune
    /// fenêtre n'est créée.
    pub fn new(app: &libadwaita::Application, startup: Startup) -> Result<Rc<Self>, StartupError> {
        let Startup {
            reporter,
            log_lines,
            init_params,
            resources,
        } = startup;

        let installation = Installation::require(&resources)?;
        let layout = Rc::new(Layout::load(&resources.layout())?);

        let store = SettingsStore::new();
        match store.migrate_legacy() {
            Ok(true) => log::info!("Ancien fichier de paramètres migré vers {}", store.path().display()),
            Ok(false) => {}
            Err(e) => reporter.report(&e, Some("Migration des paramètres impossible")),
        }

        let window = libadwaita::ApplicationWindow::builder()
            .application(app)
            .title("ltchiptool")
            .default_width(DEFAULT_SIZE.0)
            .default_height(DEFAULT_SIZE.1)
            .build();
        window.set_size_request(MIN_SIZE.0, MIN_SIZE.1);
        if let Some(display) = gtk4::gdk::Display::default() {
            gtk4::IconTheme::for_display(&display).add_search_path(resources.root());
        }
        window.set_icon_name(Some(ICON_NAME));

        let notebook = Notebook::builder().vexpand(true).hexpand(true).build();

        let frame = Rc::new(Self {
            window,
            notebook,
            session: Session::new(store, reporter.clone()),
            menu: RefCell::new(MenuRouter::new()),
            init_params,
            last_pos: Cell::new(None),
        });
        Self::setup_signals(&frame);
        show_error_reports(&frame.window, reporter.subscribe());

        frame.session.begin_loading();
        let ctx = PanelContext {
            layout: layout.clone(),
            resources,
            installation,
            reporter,
            menu_checks: MenuChecks::default(),
        };

        let main_box = GtkBox::new(Orientation::Vertical, 0);
        match layout.menu(MENU_MODEL) {
            Ok(model) => main_box.append(&Self::build_menu(&frame, &model, &ctx.menu_checks)),
            Err(e) => ctx
                .reporter
                .report(&anyhow::Error::new(e), Some("Menu indisponible")),
        }

        let paned = Paned::builder()
            .orientation(Orientation::Vertical)
            .vexpand(true)
            .start_child(&frame.notebook)
            .resize_start_child(true)
            .shrink_end_child(false)
            .build();
        match LogPanel::build(&ctx, log_lines) {
            Ok(log_panel) => {
                paned.set_end_child(Some(log_panel.base().root()));
                let log_panel: Rc<dyn Panel> = log_panel;
                if let Err(e) = frame.session.mount_permanent(LOG_PANEL, log_panel) {
                    ctx.reporter.report(&anyhow::Error::new(e), None);
                }
            }
            Err(e) => {
                frame.session.build_failed("le panneau de log", &e);
            }
        }
        main_box.append(&paned);
        frame.window.set_content(Some(&main_box));

        if frame.mount_panels(&ctx) {
            frame.on_show();
            frame.window.present();
        } else {
            log::error!("Aucun onglet utilisable, fermeture de la fenêtre");
            frame.window.close();
        }
        Ok(frame)
    }

    /// Construit puis monte les onglets intégrés et ceux des plugins.
    ///
    /// Retourne `false` si la fenêtre doit être fermée (échec avant le
    /// premier onglet).
    fn mount_panels(&self, ctx: &PanelContext) -> bool {
        let mut elements: Vec<(String, GuiElement)> = vec![
            (FLASH_PANEL.into(), GuiElement::Panel(FlashPanel::build)),
            (ABOUT_PANEL.into(), GuiElement::Panel(AboutPanel::build)),
        ];
        elements.extend(plugins::gui_elements(&plugins::discover()));

        for (id, element) in elements {
            let factory = match element {
                GuiElement::Panel(factory) => factory,
                GuiElement::Unsupported(what) => {
                    log::warn!("Élément '{id}' ignoré : {what} n'est pas un panneau");
                    continue;
                }
            };
            let panel = match factory(ctx) {
                Ok(panel) => panel,
                Err(e) => {
                    if self.session.build_failed(&id, &e) {
                        return false;
                    }
                    continue;
                }
            };
            let label = gtk4::Label::new(Some(panel.title()));
            let root = panel.base().root().clone();
            match self.session.mount(&id, panel) {
                Ok(()) => {
                    self.notebook.append_page(&root, Some(&label));
                }
                Err(e) => {
                    if self.session.build_failed(&id, &anyhow::Error::new(e)) {
                        return false;
                    }
                }
            }
        }
        self.session.is_loaded()
    }

    fn build_menu(
        frame: &Rc<Self>,
        model: &gio::MenuModel,
        checks: &MenuChecks,
    ) -> gtk4::PopoverMenuBar {
        let weak = Rc::downgrade(frame);
        let on_command = Rc::new(move |id: CommandId, checked: bool| {
            if let Some(frame) = weak.upgrade() {
                frame.on_menu(id, checked);
            }
        });
        let mut router = frame.menu.borrow_mut();
        menu_bar::build(model, &frame.window, &mut router, checks, on_command)
    }

    fn setup_signals(frame: &Rc<Self>) {
        let weak = Rc::downgrade(frame);
        frame.window.connect_close_request(move |_| {
            if let Some(frame) = weak.upgrade() {
                frame.on_close();
            }
            glib::Propagation::Proceed
        });

        let weak = Rc::downgrade(frame);
        frame.notebook.connect_switch_page(move |_, page, _| {
            if let Some(frame) = weak.upgrade() {
                let id = frame.session.find_id(|panel| panel.base().root() == page);
                frame.session.activate(id.as_deref());
            }
        });
    }

    fn on_show(&self) {
        if self.session.show(self, &self.init_params) {
            log::info!("Fenêtre principale affichée");
        }
    }

    fn on_close(&self) {
        match self.session.close(self) {
            CloseOutcome::Saved(path) => log::info!("Fermeture, paramètres dans {}", path.display()),
            CloseOutcome::Discarded => log::info!("Fermeture sans sauvegarde"),
            CloseOutcome::Failed => log::warn!("Fermeture, paramètres non sauvegardés"),
        }
    }

    fn on_menu(&self, id: CommandId, checked: bool) {
        let action = self.menu.borrow().resolve(id, checked);
        match action {
            Some(MenuAction::Quit) => self.window.close(),
            Some(MenuAction::PrintSettings) => self.session.print_settings(self),
            Some(MenuAction::Forward {
                title,
                label,
                checked,
            }) => self.session.forward_menu(&title, &label, checked),
            None => log::warn!("Commande de menu inconnue : {id}"),
        }
    }

    /// Identifiant du panneau de l'onglet actif.
    fn current_page_id(&self) -> Option<String> {
        let page = self.notebook.current_page()?;
        let widget = self.notebook.nth_page(Some(page))?;
        self.session.find_id(|panel| panel.base().root() == &widget)
    }

    fn select_page(&self, id: &str) {
        let Some(panel) = self.session.panel(id) else {
            log::debug!("Onglet mémorisé '{id}' absent");
            return;
        };
        if let Some(page) = self.notebook.page_num(panel.base().root()) {
            self.notebook.set_current_page(Some(page));
        }
    }
}

impl FrameWindow for MainFrame {
    fn main_settings(&self) -> MainSettings {
        let (width, height) = (self.window.width(), self.window.height());
        let size = if width > 0 && height > 0 {
            (width, height)
        } else {
            self.window.default_size()
        };
        MainSettings {
            pos: self.last_pos.get(),
            size: Some(size),
            page: self.current_page_id(),
        }
    }

    fn apply_main_settings(&self, settings: &MainSettings) {
        if settings.pos.is_some() {
            self.last_pos.set(settings.pos);
        }
        if let Some((width, height)) = settings.size {
            self.window
                .set_default_size(width.max(MIN_SIZE.0), height.max(MIN_SIZE.1));
        }
        if let Some(page) = &settings.page {
            self.select_page(page);
        }
    }
}
