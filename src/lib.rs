//! Project scaffolding service.
//!
//! Renders a template directory, plus any mixin directories it declares,
//! into a ZIP archive streamed straight to the HTTP client.

pub mod archive;
pub mod cloud;
pub mod config;
pub mod error;
pub mod escape;
pub mod logging;
pub mod permissions;
pub mod render;
pub mod scope;
pub mod templates;
pub mod web;

pub use config::Config;
pub use error::{InitializerError, Result};
