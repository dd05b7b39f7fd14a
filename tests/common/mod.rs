use std::sync::Once;

use bracket_rating::{
    api::{config::ApiConfig, StartggClient},
    utils::test_utils::{FakeStartgg, RecordingClock}
};

static INIT: Once = Once::new();

/// Initialize test environment with RUST_LOG=WARN
pub fn init_test_env() {
    INIT.call_once(|| {
        std::env::set_var("RUST_LOG", "warn");
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A client over `fake` with small widths and pages, so every fixture
/// crosses batch and page boundaries.
pub fn fake_client(fake: FakeStartgg) -> StartggClient<FakeStartgg, RecordingClock> {
    let mut config = ApiConfig::default()
        .with_batch_widths(1, 2)
        .expect("valid widths");
    config.entrant_page_size = 3;
    config.set_page_size = 2;

    StartggClient::new(config, fake, RecordingClock::default())
}
