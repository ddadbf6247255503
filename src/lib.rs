//! Layered template rendering: a catalog of pages built from named template
//! sources, per-request response descriptions and buffered rendering.

pub mod application;
pub mod config;
pub mod infra;
pub mod templates;
