//! Plant analysis service - identifies a plant from a photo and returns
//! agronomic guidance
//!
//! A single stateless HTTP endpoint builds a structured prompt around the
//! uploaded image, asks a multimodal model for a JSON description of the plant,
//! and reshapes the reply (including a locally computed yield total).

pub mod ai;
pub mod analysis;
pub mod app;
pub mod error;
pub mod image;
pub mod models;
pub mod prompts;
pub mod server;

pub use error::{Error, Result};
