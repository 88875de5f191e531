//! Client for connecting to the engine through the local proxy

pub mod builder;
pub mod cadence_client;
pub(crate) mod runtime;

pub use builder::CadenceClientBuilder;
pub use cadence_client::CadenceClient;
