//! Core library for the slidekit deck preprocessor
//!
//! This crate contains the content-addressed artifact cache, the renderer
//! seam, document rewriting, theming, export bundles, configuration,
//! logging, and error handling.

pub mod bundle;
pub mod cache;
pub mod config;
pub mod document;
pub mod errors;
pub mod io;
pub mod logging;
pub mod observability;
pub mod render;
pub mod theme;
