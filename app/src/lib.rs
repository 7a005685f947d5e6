//! Single-page document viewport with cursor-anchored zoom, background
//! rendering and search-result highlighting.

pub mod config;
pub mod core;
pub mod error;
pub mod pdf;
pub mod types;
