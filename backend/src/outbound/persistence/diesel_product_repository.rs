//! PostgreSQL-backed `ProductRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ProductRepository, ProductRepositoryError};
use crate::domain::product::{GeoPoint, NewProduct, Product, ProductFilter};

use super::diesel_basic_error_mapping::{basic_error_mappers, is_unique_violation};
use super::models::{NewProductRow, ProductRow};
use super::pool::DbPool;
use super::schema::products;

/// Diesel-backed implementation of the product repository port.
#[derive(Clone)]
pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(ProductRepositoryError);

/// Escape `LIKE` wildcards so user input only ever matches literally.
pub(crate) fn contains_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn row_to_product(row: ProductRow) -> Product {
    let origin = match (row.origin_lat, row.origin_lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
        _ => None,
    };
    Product {
        id: row.id,
        ean: row.ean,
        name: row.name,
        brand: row.brand,
        category: row.category,
        carbon_product_kgco2e: row.carbon_product_kgco2e,
        carbon_pack_kgco2e: row.carbon_pack_kgco2e,
        net_weight_kg: row.net_weight_kg,
        origin_country: row.origin_country,
        origin,
        coef_trans: row.coef_trans,
        created_at: row.created_at,
    }
}

#[async_trait]
impl ProductRepository for DieselProductRepository {
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ProductRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = products::table
            .select(ProductRow::as_select())
            .order_by(products::id.asc())
            .into_boxed();
        if let Some(brand) = filter.brand.as_deref() {
            query = query.filter(products::brand.eq(brand.to_owned()));
        }
        if let Some(category) = filter.category.as_deref() {
            query = query.filter(products::category.eq(category.to_owned()));
        }
        if let Some(name_query) = filter.name_query.as_deref() {
            query = query.filter(products::name.ilike(contains_pattern(name_query)));
        }

        let rows: Vec<ProductRow> = query
            .limit(i64::from(filter.limit))
            .offset(i64::from(filter.offset))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_product).collect())
    }

    async fn find_by_ean(&self, ean: &str) -> Result<Option<Product>, ProductRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProductRow> = products::table
            .filter(products::ean.eq(ean))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_product))
    }

    async fn find_by_eans(
        &self,
        eans: &[String],
    ) -> Result<Vec<Product>, ProductRepositoryError> {
        if eans.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ProductRow> = products::table
            .filter(products::ean.eq_any(eans))
            .select(ProductRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_product).collect())
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, ProductRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewProductRow {
            ean: &product.ean,
            name: &product.name,
            brand: product.brand.as_deref(),
            category: product.category.as_deref(),
            carbon_product_kgco2e: product.carbon_product_kgco2e,
            carbon_pack_kgco2e: product.carbon_pack_kgco2e,
            net_weight_kg: product.net_weight_kg,
            origin_country: product.origin_country.as_deref(),
            origin_lat: product.origin.map(|point| point.lat),
            origin_lon: product.origin.map(|point| point.lon),
            coef_trans: product.coef_trans,
        };

        let inserted: ProductRow = diesel::insert_into(products::table)
            .values(&row)
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    ProductRepositoryError::duplicate(product.ean.clone())
                } else {
                    map_diesel_error(err)
                }
            })?;
        Ok(row_to_product(inserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    #[rstest]
    #[case("lait", "%lait%")]
    #[case("100%", "%100\\%%")]
    #[case("a_b", "%a\\_b%")]
    fn like_patterns_escape_wildcards(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(contains_pattern(raw), expected);
    }

    fn row(lat: Option<f64>, lon: Option<f64>) -> ProductRow {
        ProductRow {
            id: 7,
            ean: "3017620422003".to_owned(),
            name: "Pâte à tartiner".to_owned(),
            brand: Some("Nutella".to_owned()),
            category: None,
            carbon_product_kgco2e: Some(2.5),
            carbon_pack_kgco2e: Some(0.1),
            net_weight_kg: Some(0.4),
            origin_country: Some("IT".to_owned()),
            origin_lat: lat,
            origin_lon: lon,
            coef_trans: None,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn origin_requires_both_coordinates() {
        assert_eq!(
            row_to_product(row(Some(44.7), Some(8.0))).origin,
            Some(GeoPoint { lat: 44.7, lon: 8.0 })
        );
        assert_eq!(row_to_product(row(Some(44.7), None)).origin, None);
    }
}
