// =============================================================================
// Fichier : about_panel.rs
// Rôle    : Onglet « À propos » : versions, installation, date de build
// =============================================================================

use std::rc::Rc;

use gtk4::gio;
use gtk4::prelude::*;

use crate::core::install::{InstallKind, Installation};
use crate::core::panel::PanelHooks;
use crate::ui::panels::{BasePanel, Panel, PanelContext};

pub struct AboutPanel {
    base: BasePanel,
}

/// Version affichée de l'outil ; suffixée quand il tourne depuis les sources.
fn tool_version(bundled: bool) -> String {
    let version = env!("CARGO_PKG_VERSION");
    if bundled {
        format!("v{version}")
    } else {
        format!("v{version} (dev)")
    }
}

fn installation_text(installation: &Installation) -> String {
    match (installation.kind, installation.version) {
        (InstallKind::Platform, Some(version)) => format!("LibreTiny v{version}"),
        (InstallKind::Platform, None) => "LibreTiny".to_string(),
        (InstallKind::Snapshot, _) => "LibreTiny (snapshot local)".to_string(),
    }
}

impl AboutPanel {
    pub fn build(ctx: &PanelContext) -> anyhow::Result<Rc<dyn Panel>> {
        let base = BasePanel::new(&ctx.layout, "about_panel", ctx.reporter.clone())?;

        base.find_static_text("text_tool_version")?
            .set_text(&tool_version(ctx.resources.is_bundled()));
        base.find_static_text("text_lt_version")?
            .set_text(&installation_text(&ctx.installation));

        let build_date = ctx.resources.build_date();
        let date_title = base.find_static_text("text_build_date_title")?;
        let date_text = base.find_static_text("text_build_date")?;
        date_title.set_visible(build_date.is_some());
        date_text.set_visible(build_date.is_some());
        if let Some(date) = &build_date {
            date_text.set_text(date);
        }

        let path = &ctx.installation.path;
        let link = base.find_link("button_path")?;
        link.set_label(&path.to_string_lossy());
        link.set_uri(&gio::File::for_path(path).uri());

        let logo = ctx.resources.logo();
        if logo.is_file() {
            base.find_static_bitmap("bmp_logo")?.set_filename(Some(&logo));
        } else {
            log::warn!("Logo introuvable : {}", logo.display());
        }

        let panel = Rc::new(Self { base });
        BasePanel::attach(&panel);
        Ok(panel)
    }
}

impl PanelHooks for AboutPanel {
    fn on_close(&self) {
        self.base.close();
    }
}

impl Panel for AboutPanel {
    fn base(&self) -> &BasePanel {
        &self.base
    }

    fn title(&self) -> &str {
        "About"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install::Version;
    use std::path::PathBuf;

    #[test]
    fn versions_are_labelled_for_users() {
        assert!(tool_version(false).ends_with(" (dev)"));
        assert!(!tool_version(true).contains("dev"));

        let platform = Installation {
            kind: InstallKind::Platform,
            path: PathBuf::from("/lt"),
            version: Some(Version(1, 5, 1)),
        };
        assert_eq!(installation_text(&platform), "LibreTiny v1.5.1");
        let snapshot = Installation {
            kind: InstallKind::Snapshot,
            version: None,
            ..platform
        };
        assert_eq!(installation_text(&snapshot), "LibreTiny (snapshot local)");
    }
}
