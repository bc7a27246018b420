// API module
//
// This module contains the presentation layer: the HTML ballot page and the
// JSON API, both calling into the ledger

pub mod handlers;
pub mod pages;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
