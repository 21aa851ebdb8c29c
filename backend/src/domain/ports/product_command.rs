//! Driving port for creating products.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::product::{NewProduct, Product};

/// Domain use-case port for product writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCommand: Send + Sync {
    /// Validate and store a product. Duplicate EANs yield `conflict`.
    async fn create(&self, product: NewProduct) -> Result<Product, Error>;
}

/// Fixture command without storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProductCommand;

#[async_trait]
impl ProductCommand for FixtureProductCommand {
    async fn create(&self, _product: NewProduct) -> Result<Product, Error> {
        Err(Error::service_unavailable("product storage is not configured"))
    }
}
