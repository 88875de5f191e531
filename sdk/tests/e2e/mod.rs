//! End-to-end tests for cadence-sdk
//!
//! These tests connect a real client to the in-memory proxy from the
//! `testing` feature and run workflows and activities through the full
//! message protocol.
//!
//! # Running E2E tests
//!
//! ```bash
//! cargo test --test e2e -p cadence-sdk --features testing
//! ```

mod activity_tests;
mod completion_tests;
mod fixtures;
mod workflow_tests;

use cadence_sdk::testing::TestEnvironment;
use fixtures::{Greeter, Greeting, Named};
use std::future::Future;
use std::time::Duration;

/// Default timeout for E2E tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize tracing once for all tests
static TRACING_INITIALIZED: std::sync::Once = std::sync::Once::new();

fn init_tracing() {
    TRACING_INITIALIZED.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

/// Start a test environment with the fixtures registered and a worker
/// polling the default task list.
pub async fn started_env() -> TestEnvironment {
    init_tracing();
    let env = TestEnvironment::start().await.expect("connect to the in-memory proxy");
    let client = env.client();
    client.register_workflow::<Greeter>().await.expect("register Greeter");
    client.register_workflow::<Named>().await.expect("register Named");
    client.register_activity::<Greeting>().await.expect("register Greeting");
    client.start_worker(None).await.expect("start worker");
    env
}

/// Run `future` under [`TEST_TIMEOUT`].
pub async fn with_timeout<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TEST_TIMEOUT, future)
        .await
        .expect("test timed out")
}

/// Poll `condition` until it holds.
pub async fn eventually<F: FnMut() -> bool>(mut condition: F) {
    with_timeout(async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}
