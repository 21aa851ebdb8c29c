//! Product catalogue entries and per-item CO2 footprints.
//!
//! A product footprint has two parts:
//!
//! - production: `net_weight_kg × (carbon_product + carbon_pack)`;
//! - transport: `net_weight_kg × haversine(origin, destination) × coef_trans`.
//!
//! Factors are kgCO2e per kg of product; the transport coefficient is kgCO2e
//! per kg·km.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};

/// Mean Earth radius used by [`GeoPoint::haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Transport coefficient applied when a product carries none.
pub const DEFAULT_TRANSPORT_COEF: f64 = 0.0001;
/// Destination used when the client sends no location.
pub const DEFAULT_DESTINATION: GeoPoint = GeoPoint {
    lat: 48.8566,
    lon: 2.3522,
};
/// Default page size for product listings.
pub const DEFAULT_PRODUCT_LIMIT: u32 = 50;
/// Upper bound on a product listing page.
pub const MAX_PRODUCT_LIMIT: u32 = 200;

/// WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Validate latitude and longitude ranges.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ProductValidationError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ProductValidationError::InvalidCoordinate);
        }
        Ok(Self { lat, lon })
    }

    /// Great-circle distance in kilometres.
    ///
    /// # Examples
    /// ```
    /// use carbon_tracker::domain::product::GeoPoint;
    ///
    /// let paris = GeoPoint { lat: 48.8566, lon: 2.3522 };
    /// let lyon = GeoPoint { lat: 45.7640, lon: 4.8357 };
    /// let km = paris.haversine_km(lyon);
    /// assert!((km - 392.0).abs() < 2.0);
    /// ```
    pub fn haversine_km(self, other: GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

/// Validation failures for product input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductValidationError {
    EmptyEan,
    EmptyName,
    InvalidCoordinate,
    NegativeValue,
}

impl fmt::Display for ProductValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEan => write!(f, "ean must not be empty"),
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::InvalidCoordinate => write!(f, "origin coordinates are out of range"),
            Self::NegativeValue => write!(f, "weights and factors must not be negative"),
        }
    }
}

impl std::error::Error for ProductValidationError {}

/// Stored product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub ean: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub carbon_product_kgco2e: Option<f64>,
    pub carbon_pack_kgco2e: Option<f64>,
    pub net_weight_kg: Option<f64>,
    pub origin_country: Option<String>,
    pub origin: Option<GeoPoint>,
    pub coef_trans: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for a new product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub ean: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub carbon_product_kgco2e: Option<f64>,
    pub carbon_pack_kgco2e: Option<f64>,
    pub net_weight_kg: Option<f64>,
    pub origin_country: Option<String>,
    pub origin: Option<GeoPoint>,
    pub coef_trans: Option<f64>,
}

impl NewProduct {
    /// Trim text fields and check invariants.
    pub fn validated(mut self) -> Result<Self, ProductValidationError> {
        self.ean = self.ean.trim().to_owned();
        self.name = self.name.trim().to_owned();
        if self.ean.is_empty() {
            return Err(ProductValidationError::EmptyEan);
        }
        if self.name.is_empty() {
            return Err(ProductValidationError::EmptyName);
        }
        let numbers = [
            self.carbon_product_kgco2e,
            self.carbon_pack_kgco2e,
            self.net_weight_kg,
            self.coef_trans,
        ];
        if numbers.iter().flatten().any(|value| *value < 0.0) {
            return Err(ProductValidationError::NegativeValue);
        }
        if let Some(origin) = self.origin {
            GeoPoint::new(origin.lat, origin.lon)?;
        }
        self.brand = non_blank(self.brand);
        self.category = non_blank(self.category);
        self.origin_country = non_blank(self.origin_country);
        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
}

/// Listing filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring of the product name.
    pub name_query: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// Computed footprint of one product.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFootprint {
    pub ean: String,
    pub name: String,
    pub production_kgco2e: Option<f64>,
    pub transport_kgco2e: Option<f64>,
    pub distance_km: Option<f64>,
    pub total_kgco2e: Option<f64>,
}

impl ItemFootprint {
    /// # Examples
    /// ```
    /// use carbon_tracker::domain::product::{GeoPoint, ItemFootprint, Product};
    /// use chrono::Utc;
    ///
    /// let product = Product {
    ///     id: 1,
    ///     ean: "3017620422003".into(),
    ///     name: "Pâte à tartiner".into(),
    ///     brand: None,
    ///     category: None,
    ///     carbon_product_kgco2e: Some(4.0),
    ///     carbon_pack_kgco2e: Some(1.0),
    ///     net_weight_kg: Some(0.4),
    ///     origin_country: None,
    ///     origin: None,
    ///     coef_trans: None,
    ///     created_at: Utc::now(),
    /// };
    /// let item = ItemFootprint::for_product(&product, GeoPoint { lat: 48.8566, lon: 2.3522 });
    /// assert_eq!(item.production_kgco2e, Some(2.0));
    /// ```
    pub fn for_product(product: &Product, destination: GeoPoint) -> Self {
        let weight = product.net_weight_kg;
        let production = match (
            weight,
            product.carbon_product_kgco2e,
            product.carbon_pack_kgco2e,
        ) {
            (Some(_), None, None) | (None, _, _) => None,
            (Some(kg), factor, pack) => {
                Some(kg * (factor.unwrap_or(0.0) + pack.unwrap_or(0.0)))
            }
        };
        let distance = product
            .origin
            .map(|origin| origin.haversine_km(destination));
        let transport = match (weight, distance) {
            (Some(kg), Some(km)) => {
                Some(kg * km * product.coef_trans.unwrap_or(DEFAULT_TRANSPORT_COEF))
            }
            _ => None,
        };
        let total = production.map(|value| value + transport.unwrap_or(0.0));

        Self {
            ean: product.ean.clone(),
            name: product.name.clone(),
            production_kgco2e: production,
            transport_kgco2e: transport,
            distance_km: distance,
            total_kgco2e: total,
        }
    }
}

/// Ranked comparison of several products.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintComparison {
    /// Ascending by total; items without CO2 data last.
    pub results: Vec<ItemFootprint>,
    /// Requested EANs with no stored product, in request order.
    pub not_found: Vec<String>,
    pub best_ean: Option<String>,
}

/// Rank the footprints of `products` for the requested EANs.
pub fn compare_footprints(
    requested: &[String],
    products: &[Product],
    destination: GeoPoint,
) -> FootprintComparison {
    let mut seen = BTreeSet::new();
    let mut results = Vec::new();
    let mut not_found = Vec::new();
    for ean in requested {
        if !seen.insert(ean.as_str()) {
            continue;
        }
        match products.iter().find(|product| &product.ean == ean) {
            Some(product) => results.push(ItemFootprint::for_product(product, destination)),
            None => not_found.push(ean.clone()),
        }
    }

    results.sort_by(|a, b| match (a.total_kgco2e, b.total_kgco2e) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    let best_ean = results
        .first()
        .filter(|item| item.total_kgco2e.is_some())
        .map(|item| item.ean.clone());

    FootprintComparison {
        results,
        not_found,
        best_ean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn base_product() -> Product {
        Product {
            id: 1,
            ean: "1".to_owned(),
            name: "Base".to_owned(),
            brand: None,
            category: None,
            carbon_product_kgco2e: Some(2.0),
            carbon_pack_kgco2e: Some(0.5),
            net_weight_kg: Some(1.0),
            origin_country: None,
            origin: None,
            coef_trans: None,
            created_at: Utc::now(),
        }
    }

    fn with(base: &Product, ean: &str, factor: Option<f64>, origin: Option<GeoPoint>) -> Product {
        Product {
            ean: ean.to_owned(),
            carbon_product_kgco2e: factor,
            origin,
            ..base.clone()
        }
    }

    #[rstest]
    fn haversine_is_zero_for_identical_points() {
        assert!(DEFAULT_DESTINATION.haversine_km(DEFAULT_DESTINATION).abs() < 1e-9);
    }

    #[rstest]
    fn transport_uses_default_coefficient(base_product: Product) {
        let origin = GeoPoint { lat: 0.0, lon: 0.0 };
        let destination = GeoPoint { lat: 0.0, lon: 1.0 };
        let product = with(&base_product, "9", Some(2.0), Some(origin));

        let item = ItemFootprint::for_product(&product, destination);
        let distance = item.distance_km.expect("distance");
        assert!((distance - 111.19).abs() < 0.1);
        let transport = item.transport_kgco2e.expect("transport");
        assert!((transport - distance * DEFAULT_TRANSPORT_COEF).abs() < 1e-9);
        let total = item.total_kgco2e.expect("total");
        assert!((total - (2.5 + transport)).abs() < 1e-9);
    }

    #[rstest]
    fn missing_weight_leaves_footprint_empty(base_product: Product) {
        let product = Product {
            net_weight_kg: None,
            ..base_product
        };
        let item = ItemFootprint::for_product(&product, DEFAULT_DESTINATION);
        assert!(item.total_kgco2e.is_none());
    }

    #[rstest]
    fn comparison_ranks_ascending_with_unknown_data_last(base_product: Product) {
        let products = vec![
            with(&base_product, "heavy", Some(9.0), None),
            with(&base_product, "light", Some(0.5), None),
            Product {
                carbon_pack_kgco2e: None,
                ..with(&base_product, "unknown", None, None)
            },
        ];
        let requested: Vec<String> = ["heavy", "missing", "unknown", "light", "heavy"]
            .iter()
            .map(|s| (*s).to_owned())
            .collect();

        let comparison = compare_footprints(&requested, &products, DEFAULT_DESTINATION);
        let order: Vec<&str> = comparison.results.iter().map(|r| r.ean.as_str()).collect();
        assert_eq!(order, ["light", "heavy", "unknown"]);
        assert_eq!(comparison.not_found, ["missing"]);
        assert_eq!(comparison.best_ean.as_deref(), Some("light"));
    }

    #[rstest]
    fn comparison_without_data_has_no_best(base_product: Product) {
        let product = Product {
            net_weight_kg: None,
            ..base_product
        };
        let comparison =
            compare_footprints(&["1".to_owned()], &[product], DEFAULT_DESTINATION);
        assert!(comparison.best_ean.is_none());
    }

    #[rstest]
    #[case("  ", "Name", ProductValidationError::EmptyEan)]
    #[case("123", " ", ProductValidationError::EmptyName)]
    fn validation_rejects_blank_identity(
        #[case] ean: &str,
        #[case] name: &str,
        #[case] expected: ProductValidationError,
    ) {
        let input = NewProduct {
            ean: ean.to_owned(),
            name: name.to_owned(),
            brand: None,
            category: None,
            carbon_product_kgco2e: None,
            carbon_pack_kgco2e: None,
            net_weight_kg: None,
            origin_country: None,
            origin: None,
            coef_trans: None,
        };
        assert_eq!(input.validated(), Err(expected));
    }

    #[rstest]
    fn validation_rejects_out_of_range_origin() {
        let input = NewProduct {
            ean: "1".to_owned(),
            name: "n".to_owned(),
            brand: Some("  ".to_owned()),
            category: None,
            carbon_product_kgco2e: None,
            carbon_pack_kgco2e: None,
            net_weight_kg: None,
            origin_country: None,
            origin: Some(GeoPoint { lat: 95.0, lon: 0.0 }),
            coef_trans: None,
        };
        assert_eq!(
            input.validated(),
            Err(ProductValidationError::InvalidCoordinate)
        );
    }
}
