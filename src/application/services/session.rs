//! Model session: drives a [`Model`] from path-addressed script operations.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use termtree::Tree;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{ClassRegistry, KindId, Model, ModelObserver, NodeId, Owner};

/// One scripted edit, addressed by slash-separated node paths.
///
/// ```text
/// insert <parent-path|/> <Kind>
/// clone <path>
/// remove <path>
/// set <path> <property> <value...>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    Insert { parent: String, kind: String },
    Clone { path: String },
    Remove { path: String },
    Set {
        path: String,
        property: String,
        value: String,
    },
}

impl FromStr for ScriptOp {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let script_err = |message: String| ApplicationError::Script {
            op: s.to_string(),
            message,
        };
        let required = |word: &str, what: &str| {
            if word.is_empty() {
                Err(script_err(format!("missing {what}")))
            } else {
                Ok(word.to_string())
            }
        };

        let (verb, rest) = split_word(s);
        let op = match verb {
            "" => return Err(script_err("empty operation".to_string())),
            "insert" => {
                let (parent, rest) = split_word(rest);
                let (kind, _) = split_word(rest);
                ScriptOp::Insert {
                    parent: required(parent, "parent path")?,
                    kind: required(kind, "kind")?,
                }
            }
            "clone" => ScriptOp::Clone {
                path: required(split_word(rest).0, "path")?,
            },
            "remove" => ScriptOp::Remove {
                path: required(split_word(rest).0, "path")?,
            },
            // The value is the remainder of the line; empty clears a text property
            "set" => {
                let (path, rest) = split_word(rest);
                let (property, value) = split_word(rest);
                ScriptOp::Set {
                    path: required(path, "path")?,
                    property: required(property, "property")?,
                    value: value.trim_end().to_string(),
                }
            }
            other => return Err(script_err(format!("unknown verb '{other}'"))),
        };
        Ok(op)
    }
}

/// First whitespace-delimited word and the remainder.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

impl fmt::Display for ScriptOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptOp::Insert { parent, kind } => write!(f, "insert {parent} {kind}"),
            ScriptOp::Clone { path } => write!(f, "clone {path}"),
            ScriptOp::Remove { path } => write!(f, "remove {path}"),
            ScriptOp::Set {
                path,
                property,
                value,
            } => write!(f, "set {path} {property} {value}"),
        }
    }
}

/// Logs structural changes.
struct TraceObserver;

impl ModelObserver for TraceObserver {
    fn node_inserted(&mut self, owner: Owner, node: NodeId, index: usize) {
        debug!("observer: {} inserted under {} at {}", node, owner, index);
    }

    fn node_removed(&mut self, owner: Owner, node: NodeId) {
        debug!("observer: {} removed from {}", node, owner);
    }
}

/// A model configured from [`Settings`], with a tracing observer attached.
#[derive(Debug)]
pub struct ModelSession {
    model: Model,
}

impl ModelSession {
    pub fn new(registry: Arc<ClassRegistry>, settings: &Settings) -> Self {
        let mut model = Model::with_options(registry, settings.model_options());
        model.add_observer(Box::new(TraceObserver));
        Self { model }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// `/` or an empty path addresses the container.
    pub fn resolve_owner(&self, path: &str) -> ApplicationResult<Owner> {
        if path.trim_matches('/').is_empty() {
            return Ok(Owner::Container);
        }
        self.resolve_node(path).map(Owner::Node)
    }

    pub fn resolve_node(&self, path: &str) -> ApplicationResult<NodeId> {
        self.model
            .find_path(path)
            .ok_or_else(|| ApplicationError::PathNotFound(path.to_string()))
    }

    /// Accepts `namespace::Name` or a bare name matched against the
    /// registered kinds in registration order.
    pub fn resolve_kind(&self, kind: &str) -> ApplicationResult<KindId> {
        if let Some((namespace, name)) = kind.split_once("::") {
            return Ok(KindId::new(namespace, name));
        }
        self.model
            .registry()
            .kinds()
            .map(|k| k.id())
            .find(|id| id.name == kind)
            .cloned()
            .ok_or_else(|| ApplicationError::Script {
                op: format!("insert {kind}"),
                message: format!("no registered kind named '{kind}'"),
            })
    }

    /// Apply one operation; returns the node it created, if any.
    #[instrument(level = "debug", skip_all, fields(op = %op))]
    pub fn apply(&mut self, op: &ScriptOp) -> ApplicationResult<Option<NodeId>> {
        let created = match op {
            ScriptOp::Insert { parent, kind } => {
                let owner = self.resolve_owner(parent)?;
                let kind = self.resolve_kind(kind)?;
                Some(self.model.insert(owner, &kind)?)
            }
            ScriptOp::Clone { path } => {
                let node = self.resolve_node(path)?;
                Some(self.model.clone_node(node)?)
            }
            ScriptOp::Remove { path } => {
                let node = self.resolve_node(path)?;
                self.model.remove(node)?;
                None
            }
            ScriptOp::Set {
                path,
                property,
                value,
            } => {
                let node = self.resolve_node(path)?;
                self.model.apply_edited_value(node, property, value)?;
                None
            }
        };
        if let Some(id) = created {
            info!("{}: created {}", op, self.model.path_of(id)?);
        }
        Ok(created)
    }

    /// Apply operations in order, stopping at the first failure.
    pub fn run<'a>(&mut self, ops: impl IntoIterator<Item = &'a ScriptOp>) -> ApplicationResult<()> {
        for op in ops {
            self.apply(op)?;
        }
        self.model.validate()?;
        Ok(())
    }

    /// Tree of `name [Kind] prop=value ...` labels under a `model` root.
    pub fn render_tree(&self) -> ApplicationResult<Tree<String>> {
        let leaves = self
            .model
            .roots()
            .iter()
            .map(|&root| self.render_node(root))
            .collect::<ApplicationResult<Vec<_>>>()?;
        Ok(Tree::new("model".to_string()).with_leaves(leaves))
    }

    fn render_node(&self, id: NodeId) -> ApplicationResult<Tree<String>> {
        let node = self.model.node(id)?;
        let mut label = format!("{} [{}]", node.name, node.kind.id().name);
        for name in node.properties.names() {
            label.push_str(&format!(" {}={}", name, self.model.display_value(id, name)?));
        }
        let leaves = node
            .children
            .iter()
            .map(|&child| self.render_node(child))
            .collect::<ApplicationResult<Vec<_>>>()?;
        Ok(Tree::new(label).with_leaves(leaves))
    }

    /// The whole container as a TOML document.
    pub fn encode_toml(&self) -> ApplicationResult<String> {
        let encoding = self.model.encode_all()?;
        toml::to_string_pretty(&encoding).map_err(|e| ApplicationError::OperationFailed {
            context: "serialize model".to_string(),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("insert / A", ScriptOp::Insert { parent: "/".into(), kind: "A".into() })]
    #[case("clone A/B", ScriptOp::Clone { path: "A/B".into() })]
    #[case("  remove A ", ScriptOp::Remove { path: "A".into() })]
    #[case("insert   A/B\tLink", ScriptOp::Insert { parent: "A/B".into(), kind: "Link".into() })]
    #[case("set A/C label hello world", ScriptOp::Set {
        path: "A/C".into(),
        property: "label".into(),
        value: "hello world".into(),
    })]
    fn given_op_text_when_parsing_then_yields_op(#[case] text: &str, #[case] expected: ScriptOp) {
        assert_eq!(text.parse::<ScriptOp>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("insert /")]
    #[case("rename A B")]
    fn given_malformed_op_when_parsing_then_script_error(#[case] text: &str) {
        assert!(matches!(
            text.parse::<ScriptOp>(),
            Err(ApplicationError::Script { .. })
        ));
    }
}
