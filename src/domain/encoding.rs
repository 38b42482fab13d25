//! Serializable tree encodings.
//!
//! These are the structures `encode` produces and `decode` consumes. They are
//! plain serde types so callers can persist them in any format; the CLI
//! renders them as TOML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::kind::KindId;

/// Encoded state of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEncoding {
    /// Node name at encode time; re-disambiguated on decode.
    pub text: String,
    #[serde(default)]
    pub children: Vec<ChildEncoding>,
    #[serde(default)]
    pub props: BTreeMap<String, PropertyEncoding>,
}

/// A child node together with the kind needed to reconstruct it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildEncoding {
    pub kind: String,
    pub namespace: String,
    pub node: NodeEncoding,
}

impl ChildEncoding {
    pub fn new(kind: &KindId, node: NodeEncoding) -> Self {
        Self {
            kind: kind.name.clone(),
            namespace: kind.namespace.clone(),
            node,
        }
    }

    pub fn kind_id(&self) -> KindId {
        KindId::new(&self.namespace, &self.kind)
    }
}

/// Encoded value of a single property.
///
/// Text and numeric properties both encode as a string (numbers in decimal
/// form); object references carry their target kind alongside the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyEncoding {
    Scalar(String),
    ObjectRef(ObjectRefEncoding),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRefEncoding {
    /// Name of the referenced sibling, absent for "no reference".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub kind: String,
    pub namespace: String,
}

impl ObjectRefEncoding {
    pub fn target_kind(&self) -> KindId {
        KindId::new(&self.namespace, &self.kind)
    }
}

/// Encoded state of a whole container: every root with its kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelEncoding {
    #[serde(default)]
    pub roots: Vec<ChildEncoding>,
}
