//! Testing utilities.
//!
//! [`FakeProxy`] plays the proxy process in memory so a real client can
//! run workflows and activities without an engine. [`TestEnvironment`]
//! wires the two together.

mod fake_proxy;
mod test_environment;

pub use fake_proxy::{FakeProxy, RecordedHeartbeat, Registration, RegistrationKind};
pub use test_environment::TestEnvironment;
