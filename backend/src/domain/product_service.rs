//! Product catalogue service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::ports::{
    AuditRepository, CompareProductsRequest, ProductCommand, ProductPage, ProductQuery,
    ProductRepository, ProductRepositoryError, record_best_effort,
};
use crate::domain::product::{
    DEFAULT_DESTINATION, DEFAULT_PRODUCT_LIMIT, FootprintComparison, MAX_PRODUCT_LIMIT,
    NewProduct, Product, ProductFilter, ProductValidationError, compare_footprints,
};
use crate::domain::{Error, NewAuditEvent};

/// Product service implementing the product driving ports.
#[derive(Clone)]
pub struct ProductService<R> {
    repo: Arc<R>,
    audit: Arc<dyn AuditRepository>,
}

impl<R> ProductService<R> {
    pub fn new(repo: Arc<R>, audit: Arc<dyn AuditRepository>) -> Self {
        Self { repo, audit }
    }
}

impl<R> ProductService<R>
where
    R: ProductRepository,
{
    fn map_repository_error(error: ProductRepositoryError) -> Error {
        match error {
            ProductRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("product repository unavailable: {message}"))
            }
            ProductRepositoryError::Query { message } => {
                Error::internal(format!("product repository error: {message}"))
            }
            ProductRepositoryError::Duplicate { ean } => Error::conflict("Product already exists")
                .with_details(json!({ "ean": ean, "code": "duplicate_ean" })),
        }
    }

    fn map_validation_error(error: ProductValidationError) -> Error {
        let (field, code) = match error {
            ProductValidationError::EmptyEan => ("ean", "empty"),
            ProductValidationError::EmptyName => ("name", "empty"),
            ProductValidationError::InvalidCoordinate => ("origin", "out_of_range"),
            ProductValidationError::NegativeValue => ("body", "negative_value"),
        };
        Error::unprocessable(error.to_string()).with_details(json!({
            "field": field,
            "code": code,
        }))
    }
}

#[async_trait]
impl<R> ProductQuery for ProductService<R>
where
    R: ProductRepository,
{
    async fn list(&self, mut filter: ProductFilter) -> Result<ProductPage, Error> {
        if filter.limit == 0 {
            filter.limit = DEFAULT_PRODUCT_LIMIT;
        }
        filter.limit = filter.limit.min(MAX_PRODUCT_LIMIT);
        let items = self
            .repo
            .list(&filter)
            .await
            .map_err(Self::map_repository_error)?;
        Ok(ProductPage {
            count: items.len(),
            items,
        })
    }

    async fn get(&self, ean: &str) -> Result<Product, Error> {
        self.repo
            .find_by_ean(ean.trim())
            .await
            .map_err(Self::map_repository_error)?
            .ok_or_else(|| Error::not_found("Product not found"))
    }

    async fn compare(
        &self,
        request: CompareProductsRequest,
    ) -> Result<FootprintComparison, Error> {
        let eans: Vec<String> = request
            .eans
            .iter()
            .map(|ean| ean.trim().to_owned())
            .filter(|ean| !ean.is_empty())
            .collect();
        if eans.is_empty() {
            return Err(Error::unprocessable("eans must contain at least one EAN")
                .with_details(json!({ "field": "eans", "code": "empty" })));
        }

        let products = self
            .repo
            .find_by_eans(&eans)
            .await
            .map_err(Self::map_repository_error)?;
        Ok(compare_footprints(
            &eans,
            &products,
            request.destination.unwrap_or(DEFAULT_DESTINATION),
        ))
    }
}

#[async_trait]
impl<R> ProductCommand for ProductService<R>
where
    R: ProductRepository,
{
    async fn create(&self, product: NewProduct) -> Result<Product, Error> {
        let product = product.validated().map_err(Self::map_validation_error)?;
        let created = self
            .repo
            .insert(&product)
            .await
            .map_err(Self::map_repository_error)?;

        record_best_effort(
            self.audit.as_ref(),
            NewAuditEvent::new(
                "product_created",
                format!("ean={} name={}", created.ean, created.name),
            ),
        )
        .await;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{FixtureAuditRepository, MockAuditRepository, MockProductRepository};
    use crate::domain::product::GeoPoint;
    use crate::domain::test_fixtures::fixture_timestamp;
    use rstest::{fixture, rstest};

    #[fixture]
    fn new_product() -> NewProduct {
        NewProduct {
            ean: " 3017620422003 ".to_owned(),
            name: "Pâte à tartiner".to_owned(),
            brand: Some("Ferrero".to_owned()),
            category: Some("spreads".to_owned()),
            carbon_product_kgco2e: Some(4.0),
            carbon_pack_kgco2e: Some(0.2),
            net_weight_kg: Some(0.4),
            origin_country: Some("IT".to_owned()),
            origin: Some(GeoPoint {
                lat: 44.7,
                lon: 8.03,
            }),
            coef_trans: None,
        }
    }

    fn stored(input: &NewProduct, id: i64) -> Product {
        Product {
            id,
            ean: input.ean.trim().to_owned(),
            name: input.name.clone(),
            brand: input.brand.clone(),
            category: input.category.clone(),
            carbon_product_kgco2e: input.carbon_product_kgco2e,
            carbon_pack_kgco2e: input.carbon_pack_kgco2e,
            net_weight_kg: input.net_weight_kg,
            origin_country: input.origin_country.clone(),
            origin: input.origin,
            coef_trans: input.coef_trans,
            created_at: fixture_timestamp(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn create_trims_and_audits(new_product: NewProduct) {
        let expected = stored(&new_product, 7);
        let mut repo = MockProductRepository::new();
        repo.expect_insert()
            .withf(|product| product.ean == "3017620422003")
            .times(1)
            .return_once(move |_| Ok(expected));
        let mut audit = MockAuditRepository::new();
        audit
            .expect_record()
            .withf(|event| event.event_type() == "product_created")
            .times(1)
            .returning(|_| Ok(()));

        let service = ProductService::new(Arc::new(repo), Arc::new(audit));
        let created = service.create(new_product).await.expect("created");
        assert_eq!(created.id, 7);
    }

    #[rstest]
    #[tokio::test]
    async fn create_maps_duplicates_to_conflict(new_product: NewProduct) {
        let mut repo = MockProductRepository::new();
        repo.expect_insert()
            .return_once(|product| Err(ProductRepositoryError::duplicate(product.ean.clone())));

        let service = ProductService::new(Arc::new(repo), Arc::new(FixtureAuditRepository));
        let error = service.create(new_product).await.expect_err("duplicate");
        assert_eq!(error.code(), ErrorCode::Conflict);
        assert_eq!(error.message(), "Product already exists");
    }

    #[rstest]
    #[tokio::test]
    async fn create_rejects_blank_name_without_touching_storage(mut new_product: NewProduct) {
        new_product.name = "   ".to_owned();
        let mut repo = MockProductRepository::new();
        repo.expect_insert().times(0);

        let service = ProductService::new(Arc::new(repo), Arc::new(FixtureAuditRepository));
        let error = service.create(new_product).await.expect_err("invalid");
        assert_eq!(error.code(), ErrorCode::UnprocessableEntity);
        assert_eq!(
            error.details().and_then(|d| d.get("field")).and_then(|f| f.as_str()),
            Some("name")
        );
    }

    #[tokio::test]
    async fn get_reports_unknown_ean() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_ean().return_once(|_| Ok(None));

        let service = ProductService::new(Arc::new(repo), Arc::new(FixtureAuditRepository));
        let error = service.get("000").await.expect_err("missing");
        assert_eq!(error.code(), ErrorCode::NotFound);
        assert_eq!(error.message(), "Product not found");
    }

    #[rstest]
    #[case(0, DEFAULT_PRODUCT_LIMIT)]
    #[case(10, 10)]
    #[case(5_000, MAX_PRODUCT_LIMIT)]
    #[tokio::test]
    async fn list_clamps_limits(#[case] requested: u32, #[case] applied: u32) {
        let mut repo = MockProductRepository::new();
        repo.expect_list()
            .withf(move |filter| filter.limit == applied)
            .times(1)
            .return_once(|_| Ok(Vec::new()));

        let service = ProductService::new(Arc::new(repo), Arc::new(FixtureAuditRepository));
        let page = service
            .list(ProductFilter {
                limit: requested,
                ..ProductFilter::default()
            })
            .await
            .expect("page");
        assert_eq!(page.count, 0);
    }

    #[tokio::test]
    async fn compare_rejects_empty_lists() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_eans().times(0);

        let service = ProductService::new(Arc::new(repo), Arc::new(FixtureAuditRepository));
        let error = service
            .compare(CompareProductsRequest {
                eans: vec!["  ".to_owned()],
                destination: None,
            })
            .await
            .expect_err("empty");
        assert_eq!(error.code(), ErrorCode::UnprocessableEntity);
    }

    #[rstest]
    #[tokio::test]
    async fn compare_ranks_known_products(new_product: NewProduct) {
        let product = stored(&new_product, 1);
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_eans()
            .return_once(move |_| Ok(vec![product]));

        let service = ProductService::new(Arc::new(repo), Arc::new(FixtureAuditRepository));
        let comparison = service
            .compare(CompareProductsRequest {
                eans: vec!["3017620422003".to_owned(), "missing".to_owned()],
                destination: None,
            })
            .await
            .expect("comparison");
        assert_eq!(comparison.best_ean.as_deref(), Some("3017620422003"));
        assert_eq!(comparison.not_found, ["missing"]);
        assert!(comparison.results[0].transport_kgco2e.is_some());
    }
}
