//! Port for product catalogue persistence.

use async_trait::async_trait;

use crate::domain::product::{NewProduct, Product, ProductFilter};

use super::define_port_error;

define_port_error! {
    /// Errors raised by product repository adapters.
    pub enum ProductRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "product repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "product repository query failed: {message}",
        /// A product with the same EAN already exists.
        Duplicate { ean: String } =>
            "product {ean} already exists",
    }
}

/// Port for reading and creating products.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// List products matching `filter`, ordered by id.
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ProductRepositoryError>;

    /// Fetch a product by EAN.
    async fn find_by_ean(&self, ean: &str) -> Result<Option<Product>, ProductRepositoryError>;

    /// Fetch every stored product whose EAN appears in `eans`.
    async fn find_by_eans(&self, eans: &[String])
    -> Result<Vec<Product>, ProductRepositoryError>;

    /// Insert a product, failing with `Duplicate` on an existing EAN.
    async fn insert(&self, product: &NewProduct) -> Result<Product, ProductRepositoryError>;
}

/// Fixture repository with an empty catalogue that rejects writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProductRepository;

#[async_trait]
impl ProductRepository for FixtureProductRepository {
    async fn list(&self, _filter: &ProductFilter) -> Result<Vec<Product>, ProductRepositoryError> {
        Ok(Vec::new())
    }

    async fn find_by_ean(&self, _ean: &str) -> Result<Option<Product>, ProductRepositoryError> {
        Ok(None)
    }

    async fn find_by_eans(
        &self,
        _eans: &[String],
    ) -> Result<Vec<Product>, ProductRepositoryError> {
        Ok(Vec::new())
    }

    async fn insert(&self, _product: &NewProduct) -> Result<Product, ProductRepositoryError> {
        Err(ProductRepositoryError::connection(
            "fixture product repository is read-only",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_catalogue_is_empty() {
        let repo = FixtureProductRepository;
        let listed = repo
            .list(&ProductFilter::default())
            .await
            .expect("fixture list");
        assert!(listed.is_empty());
        assert!(repo.find_by_ean("123").await.expect("lookup").is_none());
    }

    #[test]
    fn duplicate_error_names_the_ean() {
        let error = ProductRepositoryError::duplicate("3017620422003");
        assert_eq!(error.to_string(), "product 3017620422003 already exists");
    }
}
