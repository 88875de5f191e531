//! A connected client and in-memory proxy for tests.

use super::FakeProxy;
use crate::client::CadenceClient;
use crate::config::CadenceSettings;
use crate::error::Result;
use std::time::Duration;

/// A [`CadenceClient`] connected to a [`FakeProxy`].
///
/// # Example
///
/// ```ignore
/// use cadence_sdk::testing::TestEnvironment;
///
/// let env = TestEnvironment::start().await?;
/// env.client().register_workflow::<Greeter>().await?;
/// env.client().start_worker(None).await?;
///
/// let stub = env.client().new_workflow_stub::<IGreeter>(WorkflowOptions::new())?;
/// let greeting: String = stub.execute(HELLO, ("Jeff",)).await?;
///
/// env.shutdown().await;
/// ```
pub struct TestEnvironment {
    proxy: FakeProxy,
    client: CadenceClient,
}

impl TestEnvironment {
    pub const DOMAIN: &'static str = "test-domain";
    pub const TASK_LIST: &'static str = "test-tasks";

    /// Settings used by [`TestEnvironment::start`]: the test domain is
    /// created on connect and pinging is disabled.
    pub fn settings() -> CadenceSettings {
        CadenceSettings::local(Self::DOMAIN)
            .with_default_task_list(Self::TASK_LIST)
            .with_create_domain(true)
            .with_ping(Duration::ZERO, Duration::from_secs(1))
    }

    pub async fn start() -> Result<Self> {
        Self::with_settings(Self::settings()).await
    }

    pub async fn with_settings(settings: CadenceSettings) -> Result<Self> {
        let (proxy, transport) = FakeProxy::start();
        let client = CadenceClient::connect_with(settings, transport).await?;
        Ok(Self { proxy, client })
    }

    pub fn client(&self) -> &CadenceClient {
        &self.client
    }

    pub fn proxy(&self) -> &FakeProxy {
        &self.proxy
    }

    /// Close the client, then the proxy.
    pub async fn shutdown(self) {
        self.client.close().await;
        self.proxy.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CadenceError;

    #[tokio::test]
    async fn test_connect_registers_domain() {
        let env = TestEnvironment::start().await.unwrap();
        assert_eq!(env.proxy().domains(), vec![TestEnvironment::DOMAIN.to_string()]);
        assert_eq!(env.proxy().identity().as_deref(), Some(env.client().identity()));
        env.shutdown().await;
    }

    #[tokio::test]
    async fn test_ping_and_close() {
        let env = TestEnvironment::start().await.unwrap();
        env.client().ping().await.unwrap();
        env.client().ping().await.unwrap();
        assert_eq!(env.proxy().pings(), 2);

        let client = env.client().clone();
        client.close().await;
        assert!(client.is_closed());
        assert!(env.proxy().is_terminated());
        assert!(matches!(client.ping().await, Err(CadenceError::ConnectionClosed)));

        // closing twice is a no-op
        client.close().await;
        env.shutdown().await;
    }

    #[tokio::test]
    async fn test_workers_by_task_list() {
        let env = TestEnvironment::start().await.unwrap();
        let client = env.client();

        let first = client.start_worker(None).await.unwrap();
        let err = client.start_worker(Some(TestEnvironment::TASK_LIST)).await.unwrap_err();
        assert!(matches!(err, CadenceError::InvalidOperation(_)));
        client.start_worker(Some("other")).await.unwrap();
        assert_eq!(env.proxy().workers(), vec!["other".to_string(), "test-tasks".to_string()]);

        client.stop_worker(first).await.unwrap();
        assert_eq!(env.proxy().workers(), vec!["other".to_string()]);
        assert!(client.stop_worker(first).await.is_err());
        env.shutdown().await;
    }
}
