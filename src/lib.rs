//! MindLine: client core for a private two-person journal and chat.
//!
//! DESIGN
//! ======
//! All persistence is owned by a hosted document store, consumed through the
//! `store::DocumentStore` trait. This crate holds the client-side logic that
//! sits on top of it: the live chat feed, the optimistic message reducer, the
//! touch gesture machine, link previews, folders, theming and auth helpers.
//!
//! Hosts drive a `chat::session::ChatSession` from their UI event loop and
//! render from its `ChatState`.

pub mod auth;
pub mod chat;
pub mod config;
pub mod folders;
pub mod model;
pub mod prefs;
pub mod store;
pub mod theme;

pub use config::MindlineConfig;

/// Install a `tracing` fmt subscriber for hosts that do not bring their own.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();
}
