//! Bridges between server traffic and the editor host

pub mod content;
pub mod registration;

pub use content::{render_panel_html, ContentDisplayBridge, ContentProvider};
pub use registration::LanguageRegistrationBridge;
