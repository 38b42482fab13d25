//! Shared setup for unit and integration tests.

use std::sync::Once;

use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::catalog;
use crate::config::Settings;
use crate::domain::{DecodePolicy, Model, ModelOptions, ReferencePolicy};

static TEST_SETUP: Once = Once::new();

/// Install a test subscriber once per process. `RUST_LOG` overrides the
/// default `proptree=debug` filter.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("proptree=debug"));
        let layer = fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter);

        if tracing::dispatcher::has_been_set() {
            return;
        }
        if let Err(e) = tracing_subscriber::registry().with(layer).try_init() {
            eprintln!("Error: Failed to set up logging: {}", e);
        }
        info!("Test Setup complete");
    });
}

/// Empty model over the demo catalog with the given policies.
pub fn demo_model(references: ReferencePolicy, on_decode_error: DecodePolicy) -> Model {
    init_test_setup();
    let registry = catalog::demo_registry().expect("demo catalog is consistent");
    Model::with_options(
        registry,
        ModelOptions {
            references,
            on_decode_error,
        },
    )
}

/// Empty model over the demo catalog with default settings.
pub fn default_demo_model() -> Model {
    let options = Settings::default().model_options();
    demo_model(options.references, options.on_decode_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_repeated_setup_when_initializing_then_is_idempotent() {
        init_test_setup();
        init_test_setup();
        assert!(default_demo_model().roots().is_empty());
    }
}
