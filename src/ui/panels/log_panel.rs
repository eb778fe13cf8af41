// =============================================================================
// Fichier : log_panel.rs
// Rôle    : Panneau de log permanent, affiché sous les onglets
// =============================================================================

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use gtk4::prelude::*;
use gtk4::{glib, Button, CheckButton, DropDown, TextBuffer, TextView};
use log::{Level, LevelFilter};
use serde_json::Value;

use crate::core::logger::{LogLine, LEVELS};
use crate::core::panel::PanelHooks;
use crate::core::settings::PanelSettings;
use crate::ui::menu_bar::MenuChecks;
use crate::ui::panels::{BasePanel, Panel, PanelContext, SelfRef};

/// Nombre maximal de lignes conservées.
const MAX_LINES: i32 = 5000;

/// Nombre maximal de lignes traitées par passage du minuteur.
const LINES_PER_TICK: usize = 256;

const LOG_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Panneau affichant les messages de log de l'application.
pub struct LogPanel {
    base: BasePanel,
    combo_level: DropDown,
    check_auto_scroll: CheckButton,
    text_view: TextView,
    buffer: TextBuffer,
    auto_scroll: Cell<bool>,
    menu_checks: MenuChecks,
}

fn level_tag(level: Level) -> Option<&'static str> {
    match level {
        Level::Error => Some("error"),
        Level::Warn => Some("warn"),
        Level::Info => None,
        Level::Debug => Some("debug"),
        Level::Trace => Some("trace"),
    }
}

fn level_index(filter: LevelFilter) -> u32 {
    LEVELS
        .iter()
        .position(|l| *l == filter)
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(2)
}

impl LogPanel {
    pub fn build(
        ctx: &PanelContext,
        lines: async_channel::Receiver<LogLine>,
    ) -> anyhow::Result<Rc<Self>> {
        let base = BasePanel::new(&ctx.layout, "log_panel", ctx.reporter.clone())?;
        let this: SelfRef<Self> = SelfRef::new();

        let combo_level = base.bind_combo_box("combo_level")?;
        let check_auto_scroll = base.bind_check_box("check_auto_scroll")?;
        base.bind_button("button_clear", this.handler(|panel: &Self, _: &Button| panel.clear()))?;
        let text_view: TextView = base.find("text_log")?;
        let buffer = text_view.buffer();

        let tag_table = buffer.tag_table();
        tag_table.add(
            &gtk4::TextTag::builder()
                .name("error")
                .foreground("#ff4444")
                .weight(700)
                .build(),
        );
        tag_table.add(&gtk4::TextTag::builder().name("warn").foreground("orange").build());
        tag_table.add(&gtk4::TextTag::builder().name("debug").foreground("#888888").build());
        tag_table.add(
            &gtk4::TextTag::builder()
                .name("trace")
                .foreground("#888888")
                .style(gtk4::pango::Style::Italic)
                .build(),
        );

        combo_level.set_selected(level_index(log::max_level()));
        check_auto_scroll.set_active(true);

        let panel = Rc::new(Self {
            base,
            combo_level,
            check_auto_scroll,
            text_view,
            buffer,
            auto_scroll: Cell::new(true),
            menu_checks: ctx.menu_checks.clone(),
        });
        BasePanel::attach(&panel);
        this.set(Rc::downgrade(&panel));

        // Consommation des lignes de log sur le thread UI.
        glib::timeout_add_local(LOG_POLL_INTERVAL, move || {
            let Some(panel) = this.get() else {
                return glib::ControlFlow::Break;
            };
            for _ in 0..LINES_PER_TICK {
                match lines.try_recv() {
                    Ok(line) => panel.append(&line),
                    Err(async_channel::TryRecvError::Empty) => break,
                    Err(async_channel::TryRecvError::Closed) => return glib::ControlFlow::Break,
                }
            }
            glib::ControlFlow::Continue
        });

        Ok(panel)
    }

    fn append(&self, line: &LogLine) {
        let mut end_iter = self.buffer.end_iter();
        let text = format!("{}\n", line.display());
        let tag = level_tag(line.level).and_then(|name| self.buffer.tag_table().lookup(name));
        match tag {
            Some(tag) => self.buffer.insert_with_tags(&mut end_iter, &text, &[&tag]),
            None => self.buffer.insert(&mut end_iter, &text),
        }
        self.trim_scrollback();
        if self.auto_scroll.get() {
            self.scroll_to_bottom();
        }
    }

    /// Supprime les anciennes lignes au-delà de la limite.
    fn trim_scrollback(&self) {
        let line_count = self.buffer.line_count();
        if line_count <= MAX_LINES {
            return;
        }
        let mut start = self.buffer.start_iter();
        let mut end = self
            .buffer
            .iter_at_line(line_count - MAX_LINES)
            .unwrap_or(start);
        self.buffer.delete(&mut start, &mut end);
    }

    fn scroll_to_bottom(&self) {
        let end_mark = self.buffer.create_mark(None, &self.buffer.end_iter(), false);
        self.text_view.scroll_to_mark(&end_mark, 0.0, false, 0.0, 1.0);
        self.buffer.delete_mark(&end_mark);
    }

    pub fn clear(&self) {
        self.buffer
            .delete(&mut self.buffer.start_iter(), &mut self.buffer.end_iter());
    }

    fn selected_level(&self) -> LevelFilter {
        usize::try_from(self.combo_level.selected())
            .ok()
            .and_then(|i| LEVELS.get(i).copied())
            .unwrap_or(LevelFilter::Info)
    }
}

impl PanelHooks for LogPanel {
    fn settings(&self) -> PanelSettings {
        let mut settings = PanelSettings::new();
        settings.insert(
            "level".into(),
            Value::String(self.selected_level().as_str().to_lowercase()),
        );
        settings.insert("auto_scroll".into(), Value::Bool(self.auto_scroll.get()));
        settings
    }

    fn set_settings(&self, settings: &PanelSettings) {
        if let Some(level) = settings
            .get("level")
            .and_then(Value::as_str)
            .and_then(crate::core::logger::parse_level)
        {
            self.combo_level.set_selected(level_index(level));
        }
        if let Some(auto_scroll) = settings.get("auto_scroll").and_then(Value::as_bool) {
            self.check_auto_scroll.set_active(auto_scroll);
        }
    }

    fn on_show(&self) {
        self.base.do_update(None);
    }

    fn on_close(&self) {
        self.base.close();
    }

    fn on_menu(&self, title: &str, label: &str, checked: bool) {
        match (title, label) {
            ("Log", "Clear") => self.clear(),
            ("Log", "Auto-scroll") => self.check_auto_scroll.set_active(checked),
            _ => {}
        }
    }
}

impl Panel for LogPanel {
    fn base(&self) -> &BasePanel {
        &self.base
    }

    fn title(&self) -> &str {
        "Log"
    }

    fn on_update(&self, _target: Option<&gtk4::Widget>) {
        let level = self.selected_level();
        if log::max_level() != level {
            log::set_max_level(level);
            log::info!("Niveau de log : {level}");
        }
        let auto_scroll = self.check_auto_scroll.is_active();
        self.auto_scroll.set(auto_scroll);
        self.menu_checks.set_checked("Log", "Auto-scroll", auto_scroll);
    }
}
