// =============================================================================
// Fichier : mod.rs
// Rôle    : Couche interface GTK4/Libadwaita
// =============================================================================

pub mod dialogs;
pub mod layout;
pub mod main_frame;
pub mod menu_bar;
pub mod panels;
pub mod plugins;
