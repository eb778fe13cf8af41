// =============================================================================
// Module : core
// Rôle    : Logique indépendante du toolkit UI (aucun import gtk/glib ici)
// =============================================================================

pub mod components;
pub mod image;
pub mod install;
pub mod logger;
pub mod menu;
pub mod panel;
pub mod ports;
pub mod registry;
pub mod reporter;
pub mod resources;
pub mod session;
pub mod settings;
pub mod update;
pub mod worker;
