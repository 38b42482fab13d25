//! proptree: a hierarchical object-editing model.
//!
//! Named, typed nodes carry typed properties (text, numeric, sibling object
//! references). Sibling names stay unique through creation, decode and clone;
//! any subtree encodes to a serde structure and decodes back through a kind
//! registry.
//!
//! Layers:
//! - [`domain`]: the model, its properties, naming and encodings
//! - [`application`]: session service and built-in catalog
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod util;
