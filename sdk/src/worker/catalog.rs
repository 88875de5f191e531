//! Catalog of implementations for bulk registration.

use crate::activity::Activity;
use crate::client::CadenceClient;
use crate::error::Result;
use crate::interface::ImplementationShape;
use crate::workflow::Workflow;
use futures::future::BoxFuture;

type RegisterFn = for<'a> fn(&'a CadenceClient) -> BoxFuture<'a, Result<()>>;

/// One implementation listed in a [`Catalog`].
pub struct CatalogEntry {
    pub shape: ImplementationShape,
    register: RegisterFn,
}

impl CatalogEntry {
    pub(crate) async fn register(&self, client: &CadenceClient) -> Result<()> {
        (self.register)(client).await
    }
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("implementation", &self.shape.full_name)
            .field("auto_register", &self.shape.auto_registers())
            .finish()
    }
}

/// The implementations of a module, listed once and registered together by
/// [`CadenceClient::register_assembly`]. Only entries whose registration
/// marker sets `auto_register` are registered.
///
/// ```ignore
/// let catalog = Catalog::new()
///     .workflow::<Greeter>()
///     .activity::<GreetingActivity>();
/// client.register_assembly(&catalog).await?;
/// ```
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workflow<W: Workflow>(mut self) -> Self {
        self.entries.push(CatalogEntry {
            shape: W::implementation(),
            register: register_workflow::<W>,
        });
        self
    }

    pub fn activity<A: Activity>(mut self) -> Self {
        self.entries.push(CatalogEntry {
            shape: A::implementation(),
            register: register_activity::<A>,
        });
        self
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn register_workflow<W: Workflow>(client: &CadenceClient) -> BoxFuture<'_, Result<()>> {
    Box::pin(client.register_workflow::<W>())
}

fn register_activity<A: Activity>(client: &CadenceClient) -> BoxFuture<'_, Result<()>> {
    Box::pin(client.register_activity::<A>())
}
