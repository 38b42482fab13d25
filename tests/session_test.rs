//! Integration tests for the scripted model session.

use rstest::{fixture, rstest};

use proptree::application::catalog::demo_registry;
use proptree::application::services::{ModelSession, ScriptOp};
use proptree::application::ApplicationError;
use proptree::config::{CloneConfig, Settings};
use proptree::domain::{DomainError, ModelEncoding, Owner, ReferencePolicy, Value};
use proptree::util::testing::{default_demo_model, init_test_setup};

#[fixture]
fn session() -> ModelSession {
    init_test_setup();
    ModelSession::new(demo_registry().unwrap(), &Settings::default())
}

fn ops(lines: &[&str]) -> Vec<ScriptOp> {
    lines.iter().map(|l| l.parse().unwrap()).collect()
}

#[rstest]
fn given_script_when_run_then_builds_named_tree(mut session: ModelSession) {
    session
        .run(&ops(&[
            "insert / A",
            "insert A B",
            "insert A B",
            "set A/B test_float 4.4",
            "clone A/B",
        ]))
        .unwrap();

    let model = session.model();
    let b2 = session.resolve_node("A/B2").unwrap();
    assert_eq!(model.get(b2, "test_float").unwrap(), Value::Number(4.4));
    assert!(session.resolve_node("A/B1").is_ok());

    let rendered = session.render_tree().unwrap().to_string();
    assert!(rendered.starts_with("model\n"));
    assert!(rendered.contains("B2 [B] test_float=4.4 test_object=None"));
}

#[rstest]
fn given_text_with_spaces_when_set_then_value_kept_whole(mut session: ModelSession) {
    session
        .run(&ops(&["insert / C", "set C label hello big world"]))
        .unwrap();

    let c = session.resolve_node("C").unwrap();
    assert_eq!(
        session.model().get(c, "label").unwrap(),
        Value::Text("hello big world".into())
    );
}

#[rstest]
#[case("clone Nowhere")]
#[case("insert Missing/Path B")]
fn given_unknown_path_when_applied_then_path_not_found(
    mut session: ModelSession,
    #[case] line: &str,
) {
    let err = session.apply(&line.parse().unwrap()).unwrap_err();
    assert!(matches!(err, ApplicationError::PathNotFound(_)));
}

#[rstest]
fn given_unknown_kind_name_when_inserting_then_script_error(mut session: ModelSession) {
    let err = session.apply(&"insert / Ghost".parse().unwrap()).unwrap_err();
    assert!(matches!(err, ApplicationError::Script { .. }));

    // A qualified name goes straight to the registry
    let err = session.apply(&"insert / other::A".parse().unwrap()).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::UnknownKind(_))
    ));
}

#[rstest]
fn given_remove_when_applied_then_subtree_gone(mut session: ModelSession) {
    session
        .run(&ops(&["insert / A", "insert A B", "insert A/B C", "remove A/B"]))
        .unwrap();

    assert!(session.resolve_node("A/B").is_err());
    assert_eq!(session.model().tree().len(), 1);
    assert_eq!(session.resolve_owner("/").unwrap(), Owner::Container);
}

#[rstest]
fn given_session_when_encoded_as_toml_then_decodes_to_same_model(mut session: ModelSession) {
    session
        .run(&ops(&[
            "insert / A",
            "insert A C",
            "insert A B",
            "insert A Link",
            "set A/L target L",
            "set A/C label quoted \"text\"",
        ]))
        .unwrap();

    let toml_text = session.encode_toml().unwrap();
    let encoding: ModelEncoding = toml::from_str(&toml_text).unwrap();
    assert_eq!(encoding, session.model().encode_all().unwrap());

    let mut fresh = default_demo_model();
    fresh.decode_all(&encoding).unwrap();
    assert_eq!(fresh.encode_all().unwrap(), encoding);
    let l = fresh.find_path("A/L").unwrap();
    assert_eq!(fresh.display_value(l, "target").unwrap(), "L");
}

#[test]
fn given_rebind_settings_when_cloning_then_session_uses_policy() {
    let settings = Settings {
        clone: CloneConfig {
            references: ReferencePolicy::RebindToClone,
        },
        ..Settings::default()
    };
    let mut session = ModelSession::new(demo_registry().unwrap(), &settings);

    session
        .run(&ops(&["insert / A", "insert A Link", "set A/L target L", "clone A/L"]))
        .unwrap();

    let l1 = session.resolve_node("A/L1").unwrap();
    assert_eq!(session.model().display_value(l1, "target").unwrap(), "L1");
}
