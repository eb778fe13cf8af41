// =============================================================================
// Fichier : plugins.rs
// Rôle    : Plugins contribuant des onglets à la fenêtre principale
//
// Les plugins s'enregistrent statiquement :
//
//   inventory::submit!(PluginRegistration { build: || Box::new(MonPlugin) });
// =============================================================================

use crate::core::registry::plugin_panel_id;
use crate::ui::panels::PanelFactory;

/// Élément d'interface fourni par un plugin.
pub enum GuiElement {
    /// Onglet construit par la fenêtre principale.
    Panel(PanelFactory),
    /// Élément que cette interface ne sait pas afficher (description).
    Unsupported(String),
}

/// Plugin de l'application.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Le plugin fournit-il des éléments d'interface ?
    fn has_gui(&self) -> bool {
        false
    }

    /// Éléments d'interface, nommés de façon unique au sein du plugin.
    fn build_gui(&self) -> Vec<(String, GuiElement)> {
        Vec::new()
    }
}

/// Enregistrement statique d'un plugin.
pub struct PluginRegistration {
    pub build: fn() -> Box<dyn Plugin>,
}

inventory::collect!(PluginRegistration);

/// Instancie tous les plugins enregistrés.
pub fn discover() -> Vec<Box<dyn Plugin>> {
    let mut plugins = Vec::new();
    for reg in inventory::iter::<PluginRegistration> {
        let plugin = (reg.build)();
        log::debug!("Plugin '{}' trouvé", plugin.name());
        plugins.push(plugin);
    }
    plugins
}

/// Éléments d'interface des plugins, identifiés par `plugin.<plugin>.<nom>`.
/// Les plugins sans interface sont ignorés.
pub fn gui_elements(plugins: &[Box<dyn Plugin>]) -> Vec<(String, GuiElement)> {
    let mut elements = Vec::new();
    for plugin in plugins.iter().filter(|p| p.has_gui()) {
        for (gui_name, element) in plugin.build_gui() {
            elements.push((plugin_panel_id(plugin.name(), &gui_name), element));
        }
    }
    elements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::panels::{Panel, PanelContext};
    use std::rc::Rc;

    fn never_built(_: &PanelContext) -> anyhow::Result<Rc<dyn Panel>> {
        anyhow::bail!("non construit dans les tests")
    }

    struct Demo;

    impl Plugin for Demo {
        fn name(&self) -> &str {
            "demo"
        }

        fn has_gui(&self) -> bool {
            true
        }

        fn build_gui(&self) -> Vec<(String, GuiElement)> {
            vec![
                ("settings".into(), GuiElement::Panel(never_built)),
                ("wizard".into(), GuiElement::Unsupported("assistant".into())),
            ]
        }
    }

    struct Headless;

    impl Plugin for Headless {
        fn name(&self) -> &str {
            "headless"
        }

        fn build_gui(&self) -> Vec<(String, GuiElement)> {
            vec![("ignored".into(), GuiElement::Panel(never_built))]
        }
    }

    inventory::submit!(PluginRegistration {
        build: || Box::new(Demo)
    });

    #[test]
    fn elements_are_namespaced_per_plugin() {
        let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(Headless), Box::new(Demo)];
        let ids: Vec<String> = gui_elements(&plugins).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["plugin.demo.settings", "plugin.demo.wizard"]);
    }

    #[test]
    fn registered_plugins_are_discovered() {
        let plugins = discover();
        assert!(plugins.iter().any(|p| p.name() == "demo"));
    }
}
