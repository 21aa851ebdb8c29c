//! Product catalogue and footprint comparison handlers.
//!
//! ```text
//! GET  /products          List products with optional filters
//! GET  /products/{ean}    Fetch one product
//! POST /products          Create a product
//! POST /compare           Rank products by CO2 footprint
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::domain::ports::CompareProductsRequest;
use crate::domain::product::{
    DEFAULT_PRODUCT_LIMIT, FootprintComparison, GeoPoint, ItemFootprint, MAX_PRODUCT_LIMIT,
    NewProduct, Product, ProductFilter,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, bounded, invalid_value_error};

/// Query parameters for `GET /products`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProductsQuery {
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring of the product name.
    pub q: Option<String>,
    /// 1 to 200, default 50.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Product representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub ean: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub carbon_product_kgco2e: Option<f64>,
    pub carbon_pack_kgco2e: Option<f64>,
    pub net_weight_kg: Option<f64>,
    pub origin_country: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lon: Option<f64>,
    pub coef_trans: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(value: Product) -> Self {
        Self {
            id: value.id,
            ean: value.ean,
            name: value.name,
            brand: value.brand,
            category: value.category,
            carbon_product_kgco2e: value.carbon_product_kgco2e,
            carbon_pack_kgco2e: value.carbon_pack_kgco2e,
            net_weight_kg: value.net_weight_kg,
            origin_country: value.origin_country,
            origin_lat: value.origin.map(|point| point.lat),
            origin_lon: value.origin.map(|point| point.lon),
            coef_trans: value.coef_trans,
            created_at: value.created_at,
        }
    }
}

/// Page of products.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub count: usize,
    pub items: Vec<ProductResponse>,
}

/// Request payload for `POST /products`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateProductRequest {
    pub ean: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub carbon_product_kgco2e: Option<f64>,
    pub carbon_pack_kgco2e: Option<f64>,
    pub net_weight_kg: Option<f64>,
    pub origin_country: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lon: Option<f64>,
    pub coef_trans: Option<f64>,
}

fn parse_origin(lat: Option<f64>, lon: Option<f64>, field: FieldName) -> Result<Option<GeoPoint>, Error> {
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => GeoPoint::new(lat, lon)
            .map(Some)
            .map_err(|err| invalid_value_error(field, &format!("{lat},{lon}"), err.to_string())),
        _ => Err(invalid_value_error(
            field,
            "",
            "latitude and longitude must be provided together",
        )),
    }
}

fn parse_create_request(payload: CreateProductRequest) -> Result<NewProduct, Error> {
    Ok(NewProduct {
        ean: payload.ean.unwrap_or_default(),
        name: payload.name.unwrap_or_default(),
        brand: payload.brand,
        category: payload.category,
        carbon_product_kgco2e: payload.carbon_product_kgco2e,
        carbon_pack_kgco2e: payload.carbon_pack_kgco2e,
        net_weight_kg: payload.net_weight_kg,
        origin_country: payload.origin_country,
        origin: parse_origin(payload.origin_lat, payload.origin_lon, FieldName::new("origin"))?,
        coef_trans: payload.coef_trans,
    })
}

/// Request payload for `POST /compare`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CompareRequest {
    #[serde(default)]
    pub eans: Vec<String>,
    pub user_lat: Option<f64>,
    pub user_lon: Option<f64>,
}

/// Footprint of one compared product.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemFootprintResponse {
    pub ean: String,
    pub name: String,
    pub production_kgco2e: Option<f64>,
    pub transport_kgco2e: Option<f64>,
    pub distance_km: Option<f64>,
    #[serde(rename = "carbon_kgCO2e")]
    pub carbon_kgco2e: Option<f64>,
}

impl From<ItemFootprint> for ItemFootprintResponse {
    fn from(value: ItemFootprint) -> Self {
        Self {
            ean: value.ean,
            name: value.name,
            production_kgco2e: value.production_kgco2e,
            transport_kgco2e: value.transport_kgco2e,
            distance_km: value.distance_km,
            carbon_kgco2e: value.total_kgco2e,
        }
    }
}

/// Ranked comparison.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompareResponse {
    pub results: Vec<ItemFootprintResponse>,
    pub not_found: Vec<String>,
    pub best_ean: Option<String>,
}

impl From<FootprintComparison> for CompareResponse {
    fn from(value: FootprintComparison) -> Self {
        Self {
            results: value.results.into_iter().map(Into::into).collect(),
            not_found: value.not_found,
            best_ean: value.best_ean,
        }
    }
}

/// List products.
#[utoipa::path(
    get,
    path = "/products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Products", body = ProductListResponse),
        (status = 422, description = "Invalid paging", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["products"],
    operation_id = "listProducts"
)]
#[get("/products")]
pub async fn list_products(
    state: web::Data<HttpState>,
    query: web::Query<ListProductsQuery>,
) -> ApiResult<web::Json<ProductListResponse>> {
    let query = query.into_inner();
    let filter = ProductFilter {
        brand: query.brand,
        category: query.category,
        name_query: query.q,
        limit: bounded(
            query.limit,
            FieldName::new("limit"),
            1,
            MAX_PRODUCT_LIMIT,
            DEFAULT_PRODUCT_LIMIT,
        )?,
        offset: query.offset.unwrap_or_default(),
    };
    let page = state.products.list(filter).await?;
    Ok(web::Json(ProductListResponse {
        count: page.count,
        items: page.items.into_iter().map(Into::into).collect(),
    }))
}

/// Fetch a product by EAN.
#[utoipa::path(
    get,
    path = "/products/{ean}",
    params(("ean" = String, Path, description = "Product EAN")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorSchema)
    ),
    tags = ["products"],
    operation_id = "getProduct"
)]
#[get("/products/{ean}")]
pub async fn get_product(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ProductResponse>> {
    let product = state.products.get(&path.into_inner()).await?;
    Ok(web::Json(product.into()))
}

/// Create a product.
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 409, description = "Product already exists", body = ErrorSchema),
        (status = 422, description = "Invalid product", body = ErrorSchema)
    ),
    tags = ["products"],
    operation_id = "createProduct"
)]
#[post("/products")]
pub async fn create_product(
    state: web::Data<HttpState>,
    payload: web::Json<CreateProductRequest>,
) -> ApiResult<HttpResponse> {
    let product = parse_create_request(payload.into_inner())?;
    let created = state.products_command.create(product).await?;
    Ok(HttpResponse::Created().json(ProductResponse::from(created)))
}

/// Rank products by total footprint.
#[utoipa::path(
    post,
    path = "/compare",
    request_body = CompareRequest,
    responses(
        (status = 200, description = "Ranked footprints", body = CompareResponse),
        (status = 422, description = "No EANs supplied", body = ErrorSchema)
    ),
    tags = ["products"],
    operation_id = "compareProducts"
)]
#[post("/compare")]
pub async fn compare_products(
    state: web::Data<HttpState>,
    payload: web::Json<CompareRequest>,
) -> ApiResult<web::Json<CompareResponse>> {
    let payload = payload.into_inner();
    let destination = parse_origin(payload.user_lat, payload.user_lon, FieldName::new("user_lat"))?;
    let comparison = state
        .products
        .compare(CompareProductsRequest {
            eans: payload.eans,
            destination,
        })
        .await?;
    Ok(web::Json(comparison.into()))
}
