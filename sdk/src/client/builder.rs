//! CadenceClient builder for fluent configuration

use super::cadence_client::CadenceClient;
use crate::config::{ActivityDefaults, CadenceSettings, WorkflowDefaults};
use crate::error::{CadenceError, Result};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Builder for creating CadenceClient instances
///
/// Example:
/// ```ignore
/// let client = CadenceClient::builder()
///     .proxy_address("127.0.0.1:5000")
///     .default_domain("samples")
///     .create_domain(true)
///     .default_task_list("greetings")
///     .connect()
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CadenceClientBuilder {
    settings: CadenceSettings,
}

impl CadenceClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from complete settings
    pub fn settings(mut self, settings: CadenceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the address of the local proxy
    ///
    /// Default: "127.0.0.1:5000"
    pub fn proxy_address(mut self, address: impl Into<String>) -> Self {
        self.settings.proxy_address = address.into();
        self
    }

    /// Set the domain used when options, methods and interfaces name none
    pub fn default_domain(mut self, domain: impl Into<String>) -> Self {
        self.settings.default_domain = Some(domain.into());
        self
    }

    /// Register the default domain while connecting
    ///
    /// Default: false
    pub fn create_domain(mut self, create: bool) -> Self {
        self.settings.create_domain = create;
        self
    }

    /// Set the task list used when options, methods and interfaces name none
    pub fn default_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.settings.default_task_list = Some(task_list.into());
        self
    }

    /// Set the identity reported to the engine
    ///
    /// Default: generated per client
    pub fn client_identity(mut self, identity: impl Into<String>) -> Self {
        self.settings.client_identity = Some(identity.into());
        self
    }

    /// Set the handshake timeout
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.settings.connect_timeout = timeout;
        self
    }

    /// Set the liveness ping interval and timeout; a zero interval disables pinging
    pub fn ping(mut self, interval: Duration, timeout: Duration) -> Self {
        self.settings.ping_interval = interval;
        self.settings.ping_timeout = timeout;
        self
    }

    pub fn workflow_defaults(mut self, defaults: WorkflowDefaults) -> Self {
        self.settings.workflow = defaults;
        self
    }

    pub fn activity_defaults(mut self, defaults: ActivityDefaults) -> Self {
        self.settings.activity = defaults;
        self
    }

    /// Open a TCP connection to the proxy address and connect.
    pub async fn connect(self) -> Result<CadenceClient> {
        self.settings.validate()?;
        debug!(proxy_address = %self.settings.proxy_address, "opening proxy connection");
        let stream = tokio::time::timeout(
            self.settings.connect_timeout,
            TcpStream::connect(&self.settings.proxy_address),
        )
        .await
        .map_err(|_| {
            CadenceError::Timeout(format!(
                "could not reach the proxy at {}",
                self.settings.proxy_address
            ))
        })??;
        stream.set_nodelay(true)?;
        CadenceClient::connect_with(self.settings, stream).await
    }

    /// Connect over an existing byte stream.
    pub async fn connect_with<T>(self, transport: T) -> Result<CadenceClient>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        CadenceClient::connect_with(self.settings, transport).await
    }

    pub fn build_settings(self) -> Result<CadenceSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let settings = CadenceClientBuilder::new()
            .proxy_address("10.0.0.1:7000")
            .default_domain("samples")
            .default_task_list("greetings")
            .ping(Duration::ZERO, Duration::from_secs(1))
            .build_settings()
            .unwrap();

        assert_eq!(settings.proxy_address, "10.0.0.1:7000");
        assert_eq!(settings.default_domain.as_deref(), Some("samples"));
        assert_eq!(settings.default_task_list.as_deref(), Some("greetings"));
        assert!(settings.ping_interval.is_zero());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let err = CadenceClientBuilder::new()
            .connect_timeout(Duration::ZERO)
            .build_settings()
            .unwrap_err();
        assert!(matches!(err, CadenceError::InvalidConfiguration(_)));
    }
}
