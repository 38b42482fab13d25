//! Application layer: services and use cases
//!
//! This layer wires the domain model to settings and the built-in catalog.

pub mod catalog;
pub mod error;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
