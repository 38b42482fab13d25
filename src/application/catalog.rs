//! Built-in kind catalog used by the CLI and the tests.
//!
//! ```text
//! A     children: B, C, Link
//! B     test_float = 3.3, test_object -> C; children: C, Link
//! C     label = ""
//! Link  (standard name "L") target -> Link, weight = 1.0
//! ```

use std::sync::Arc;

use crate::domain::{ClassRegistry, DomainResult, KindId, NodeKind};

pub const NAMESPACE: &str = "demo";

pub fn kind_id(name: &str) -> KindId {
    KindId::new(NAMESPACE, name)
}

/// Register the demo kinds and freeze the registry.
pub fn demo_registry() -> DomainResult<Arc<ClassRegistry>> {
    let mut registry = ClassRegistry::new();
    registry.register(
        NodeKind::builder(NAMESPACE, "A")
            .child_kind(kind_id("B"))
            .child_kind(kind_id("C"))
            .child_kind(kind_id("Link"))
            .build(),
    )?;
    registry.register(
        NodeKind::builder(NAMESPACE, "B")
            .numeric("test_float", 3.3)
            .object_ref("test_object", kind_id("C"))
            .child_kind(kind_id("C"))
            .child_kind(kind_id("Link"))
            .build(),
    )?;
    registry.register(NodeKind::builder(NAMESPACE, "C").text("label", "").build())?;
    registry.register(
        NodeKind::builder(NAMESPACE, "Link")
            .standard_name("L")
            .object_ref("target", kind_id("Link"))
            .numeric("weight", 1.0)
            .build(),
    )?;
    registry.verify()?;
    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_demo_catalog_when_built_then_all_kinds_resolve() {
        let registry = demo_registry().unwrap();
        let names: Vec<&str> = registry.kinds().map(|k| k.id().name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "Link"]);
        assert_eq!(registry.resolve(NAMESPACE, "Link").unwrap().standard_name(), "L");
    }
}
