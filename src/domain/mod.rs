//! Domain layer: the object model and its rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod encoding;
pub mod error;
pub mod kind;
pub mod model;
pub mod naming;
pub mod property;
pub mod registry;

pub use arena::{NodeId, Owner, SiblingLookup, TreeArena, TreeNode};
pub use encoding::{ChildEncoding, ModelEncoding, NodeEncoding, ObjectRefEncoding, PropertyEncoding};
pub use error::{DomainError, DomainResult};
pub use kind::{KindId, NodeKind, NodeKindBuilder};
pub use model::{DecodePolicy, Model, ModelObserver, ModelOptions, NodeAction, ReferencePolicy};
pub use property::{EditorDescriptor, PropertyKind, PropertySet, PropertyValue, Value};
pub use registry::ClassRegistry;
