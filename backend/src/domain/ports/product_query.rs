//! Driving port for product lookups and footprint comparison.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::product::{FootprintComparison, GeoPoint, Product, ProductFilter};

/// A page of products.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductPage {
    pub count: usize,
    pub items: Vec<Product>,
}

/// Request to rank several products by footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareProductsRequest {
    pub eans: Vec<String>,
    /// Destination for transport distance; the default applies when absent.
    pub destination: Option<GeoPoint>,
}

/// Domain use-case port for product reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductQuery: Send + Sync {
    async fn list(&self, filter: ProductFilter) -> Result<ProductPage, Error>;

    /// Fetch one product; `not_found` when the EAN is unknown.
    async fn get(&self, ean: &str) -> Result<Product, Error>;

    async fn compare(&self, request: CompareProductsRequest)
    -> Result<FootprintComparison, Error>;
}

/// Fixture query over an empty catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProductQuery;

#[async_trait]
impl ProductQuery for FixtureProductQuery {
    async fn list(&self, _filter: ProductFilter) -> Result<ProductPage, Error> {
        Ok(ProductPage::default())
    }

    async fn get(&self, _ean: &str) -> Result<Product, Error> {
        Err(Error::not_found("Product not found"))
    }

    async fn compare(
        &self,
        request: CompareProductsRequest,
    ) -> Result<FootprintComparison, Error> {
        Ok(FootprintComparison {
            results: Vec::new(),
            not_found: request.eans,
            best_ean: None,
        })
    }
}
