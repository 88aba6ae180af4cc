// src/config/mod.rs

//! Build description file (`Buildrig.toml`).
//!
//! - [`model`] maps the TOML layout onto plain serde structs.
//! - [`validate`] turns a [`model::RawConfigFile`] into a checked
//!   [`model::ConfigFile`].
//! - [`loader`] reads a file from disk and knows the default locations.

pub mod loader;
pub mod model;
pub mod validate;
