// =============================================================================
// Fichier : flash_panel.rs
// Rôle    : Onglet de flashage : port série, vitesse, opération, fichier
//           firmware et vérification de l'image
// =============================================================================

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{gio, glib, Button, CheckButton, DropDown, Entry, Label, StringList};
use serde_json::Value;

use crate::core::image::{ImageCheckWorker, ImageInfo};
use crate::core::panel::{InitParams, PanelHooks};
use crate::core::ports::{list_serial_ports, PortWatcher, SerialPortInfo};
use crate::core::reporter::ErrorReporter;
use crate::core::settings::PanelSettings;
use crate::core::worker::{CompletedWork, WorkOutcome};
use crate::ui::panels::{dropdown_text, set_dropdown_by_text, BasePanel, Panel, PanelContext, SelfRef};

/// Opération choisie par l'utilisateur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Write,
    Read,
}

impl Operation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Read => "read",
        }
    }
}

pub struct FlashPanel {
    base: BasePanel,
    reporter: ErrorReporter,
    combo_port: DropDown,
    port_model: StringList,
    ports: RefCell<Vec<SerialPortInfo>>,
    /// Port mémorisé, sélectionné dès qu'il apparaît dans la liste.
    wanted_port: RefCell<Option<String>>,
    combo_baudrate: DropDown,
    radio_write: CheckButton,
    radio_read: CheckButton,
    input_file: Entry,
    button_check: Button,
    button_cancel: Button,
    text_status: Label,
    text_image: Label,
    ports_tx: async_channel::Sender<Vec<SerialPortInfo>>,
    image_tx: async_channel::Sender<ImageInfo>,
}

impl FlashPanel {
    pub fn build(ctx: &PanelContext) -> anyhow::Result<Rc<dyn Panel>> {
        let base = BasePanel::new(&ctx.layout, "flash_panel", ctx.reporter.clone())?;
        let this: SelfRef<Self> = SelfRef::new();

        let combo_port = base.bind_combo_box("combo_port")?;
        let port_model = StringList::new(&[]);
        combo_port.set_model(Some(&port_model));
        base.bind_button(
            "button_rescan",
            this.handler(|panel: &Self, _: &Button| panel.rescan_ports()),
        )?;
        let combo_baudrate = base.bind_combo_box("combo_baudrate")?;
        let radio_write = base.bind_radio_button("radio_write")?;
        let radio_read = base.bind_radio_button("radio_read")?;
        let input_file = base.bind_text_ctrl("input_file")?;
        base.bind_button(
            "button_browse",
            this.handler(|panel: &Self, _: &Button| panel.browse()),
        )?;
        let button_check = base.bind_button(
            "button_check",
            this.handler(|panel: &Self, _: &Button| panel.start_check()),
        )?;
        // Hors des widgets suivis : reste actif pendant la vérification.
        let button_cancel: Button = base.find("button_cancel")?;
        button_cancel.connect_clicked(this.handler(|panel: &Self, _: &Button| {
            panel.base.stop_work::<ImageCheckWorker>();
        }));
        let text_status = base.find_static_text("text_status")?;
        let text_image = base.find_static_text("text_image")?;

        let (ports_tx, ports_rx) = async_channel::unbounded::<Vec<SerialPortInfo>>();
        let (image_tx, image_rx) = async_channel::unbounded::<ImageInfo>();

        let panel = Rc::new(Self {
            base,
            reporter: ctx.reporter.clone(),
            combo_port,
            port_model,
            ports: RefCell::new(Vec::new()),
            wanted_port: RefCell::new(None),
            combo_baudrate,
            radio_write,
            radio_read,
            input_file,
            button_check,
            button_cancel,
            text_status,
            text_image,
            ports_tx,
            image_tx,
        });
        BasePanel::attach(&panel);
        this.set(Rc::downgrade(&panel));
        panel.base.enable_file_drop();

        let ports_ref = this.clone();
        glib::spawn_future_local(async move {
            while let Ok(ports) = ports_rx.recv().await {
                match ports_ref.get() {
                    Some(panel) => panel.set_ports(ports),
                    None => break,
                }
            }
        });
        let image_ref = this;
        glib::spawn_future_local(async move {
            while let Ok(info) = image_rx.recv().await {
                match image_ref.get() {
                    Some(panel) => panel.text_image.set_text(&info.to_string()),
                    None => break,
                }
            }
        });

        Ok(panel)
    }

    fn operation(&self) -> Operation {
        if self.radio_read.is_active() {
            Operation::Read
        } else {
            Operation::Write
        }
    }

    fn selected_port(&self) -> Option<String> {
        let ports = self.ports.borrow();
        let idx = usize::try_from(self.combo_port.selected()).ok()?;
        ports.get(idx).map(|p| p.device.clone())
    }

    fn file(&self) -> Option<PathBuf> {
        let text = self.input_file.text();
        let text = text.trim();
        (!text.is_empty()).then(|| PathBuf::from(text))
    }

    fn set_file(&self, path: &Path) {
        self.input_file.set_text(&path.to_string_lossy());
    }

    /// Remplace la liste des ports en conservant la sélection si possible.
    fn set_ports(&self, ports: Vec<SerialPortInfo>) {
        let current = self
            .wanted_port
            .borrow_mut()
            .take()
            .or_else(|| self.selected_port());
        let labels: Vec<String> = ports.iter().map(SerialPortInfo::label).collect();
        let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let selected = current
            .as_deref()
            .and_then(|device| ports.iter().position(|p| p.device == device));
        if current.is_some() && selected.is_none() {
            // Le port voulu n'est pas (encore) branché.
            *self.wanted_port.borrow_mut() = current;
        }
        *self.ports.borrow_mut() = ports;
        self.port_model
            .splice(0, self.port_model.n_items(), &label_refs);
        let idx = selected
            .and_then(|i| u32::try_from(i).ok())
            .unwrap_or(0);
        if self.combo_port.selected() != idx {
            self.combo_port.set_selected(idx);
        } else {
            self.base.do_update(None);
        }
    }

    fn rescan_ports(&self) {
        log::info!("Recherche des ports série");
        self.set_ports(list_serial_ports());
    }

    fn start_port_watcher(&self) {
        if self.base.is_working::<PortWatcher>() {
            return;
        }
        if let Err(e) = self
            .base
            .start_work(PortWatcher::new(self.ports_tx.clone()), false)
        {
            self.reporter
                .report(&e, Some("Impossible de surveiller les ports série"));
        }
    }

    fn start_check(&self) {
        let Some(path) = self.file() else {
            return;
        };
        self.text_image.set_text("");
        self.text_status.set_text("Vérification de l'image…");
        match self
            .base
            .start_work(ImageCheckWorker::new(path, self.image_tx.clone()), true)
        {
            Ok(_) => self.button_cancel.set_sensitive(true),
            Err(e) => self
                .reporter
                .report(&e, Some("Impossible de vérifier l'image")),
        }
    }

    fn browse(&self) {
        let operation = self.operation();
        let dialog = gtk4::FileDialog::builder()
            .title(match operation {
                Operation::Write => "Choisir un firmware",
                Operation::Read => "Enregistrer la lecture sous",
            })
            .modal(true)
            .build();
        if let Some(dir) = self.file().and_then(|f| f.parent().map(Path::to_path_buf)) {
            if dir.is_dir() {
                dialog.set_initial_folder(Some(&gio::File::for_path(dir)));
            }
        }
        let window = self.base.root().root().and_downcast::<gtk4::Window>();
        let entry = self.input_file.clone();
        let on_result = move |result: Result<gio::File, glib::Error>| {
            if let Some(path) = result.ok().and_then(|file| file.path()) {
                entry.set_text(&path.to_string_lossy());
            }
        };
        match operation {
            Operation::Write => dialog.open(window.as_ref(), gio::Cancellable::NONE, on_result),
            Operation::Read => dialog.save(window.as_ref(), gio::Cancellable::NONE, on_result),
        }
    }
}

impl PanelHooks for FlashPanel {
    fn set_init_params(&self, params: &InitParams) {
        if let Some(file) = &params.file {
            self.set_file(file);
            self.radio_write.set_active(true);
        }
    }

    fn settings(&self) -> PanelSettings {
        let mut settings = PanelSettings::new();
        if let Some(port) = self.selected_port() {
            settings.insert("port".into(), Value::String(port));
        }
        if let Some(baudrate) = dropdown_text(&self.combo_baudrate) {
            settings.insert("baudrate".into(), Value::String(baudrate));
        }
        if let Some(file) = self.file() {
            settings.insert("file".into(), Value::String(file.to_string_lossy().into_owned()));
        }
        settings.insert(
            "operation".into(),
            Value::String(self.operation().as_str().into()),
        );
        settings
    }

    fn set_settings(&self, settings: &PanelSettings) {
        if let Some(port) = settings.get("port").and_then(Value::as_str) {
            *self.wanted_port.borrow_mut() = Some(port.to_string());
        }
        if let Some(baudrate) = settings.get("baudrate").and_then(Value::as_str) {
            if !set_dropdown_by_text(&self.combo_baudrate, baudrate) {
                log::warn!("Vitesse mémorisée inconnue : {baudrate}");
            }
        }
        if let Some(file) = settings.get("file").and_then(Value::as_str) {
            self.set_file(Path::new(file));
        }
        match settings.get("operation").and_then(Value::as_str) {
            Some("read") => self.radio_read.set_active(true),
            Some(_) => self.radio_write.set_active(true),
            None => {}
        }
    }

    fn on_show(&self) {
        self.base.do_update(None);
        self.start_port_watcher();
    }

    fn on_close(&self) {
        self.base.close();
    }

    fn on_menu(&self, title: &str, label: &str, _checked: bool) {
        if (title, label) == ("Flash", "Rescan ports") {
            self.rescan_ports();
        }
    }

    fn on_file_drop(&self, files: &[PathBuf]) {
        if let Some(file) = files.first() {
            self.set_file(file);
            self.radio_write.set_active(true);
        }
    }
}

impl Panel for FlashPanel {
    fn base(&self) -> &BasePanel {
        &self.base
    }

    fn title(&self) -> &str {
        "Flashing"
    }

    fn on_update(&self, target: Option<&gtk4::Widget>) {
        if target == Some(self.input_file.upcast_ref::<gtk4::Widget>()) {
            self.text_image.set_text("");
        }
        let file = self.file();
        let status = if self.ports.borrow().is_empty() {
            "Aucun port série détecté"
        } else if file.is_none() {
            "Choisir un fichier"
        } else if self.operation() == Operation::Write
            && !file.as_deref().is_some_and(Path::is_file)
        {
            "Fichier introuvable"
        } else {
            "Prêt"
        };
        let checking = self.base.is_working::<ImageCheckWorker>();
        self.text_status.set_text(status);
        self.button_check.set_sensitive(
            !checking
                && self.operation() == Operation::Write
                && file.as_deref().is_some_and(Path::is_file),
        );
        self.button_cancel.set_sensitive(checking);
    }

    fn on_work_stopped(&self, work: &CompletedWork) {
        if work.is::<ImageCheckWorker>() {
            match work.outcome {
                WorkOutcome::Cancelled => log::info!("Vérification de l'image annulée"),
                WorkOutcome::Failed => self.text_image.set_text("Image invalide"),
                WorkOutcome::Finished => {}
            }
        }
        // Le suivi des ports s'arrête seul si le canal est fermé.
        if work.is::<PortWatcher>() && !self.base.is_closing() {
            log::debug!("Surveillance des ports terminée ({:?})", work.outcome);
        }
    }
}
