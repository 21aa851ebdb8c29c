//! Emission calculation and reporting handlers.
//!
//! ```text
//! POST /emissions/calc            Compute and store an emission (idempotent)
//! GET  /emissions/history         Time-bucketed series
//! GET  /emissions/summary         Per-category aggregates
//! GET  /emissions/summary_groups  Per-category aggregates for each group
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::aggregation::{
    CategoryAggregate, DEFAULT_HISTORY_LIMIT, DEFAULT_SUMMARY_LIMIT, DateRange,
    GroupCategorySummary, HistoryGroupBy, HistoryPoint, HistoryQuery, HistoryReport,
    Interval, MAX_AGGREGATE_LIMIT, SortOrder, SummaryQuery, SummarySort, parse_metrics,
};
use crate::domain::emission::{
    EmissionCalculation, EmissionInput, EmissionInputError, ParseQuantityUnitError, QuantityUnit,
};
use crate::domain::ports::{CalculateEmissionRequest, CalculateEmissionResponse};
use crate::inbound::http::ApiResult;
use crate::inbound::http::content::{CsvWriter, ResponseFormat, cell, csv_response, negotiate};
use crate::inbound::http::idempotency::resolve_idempotency_key;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, bounded, invalid_value_error, missing_field_error, parse_choice, parse_date_range,
    parse_id_list, parse_optional_rfc3339_timestamp,
};

/// Request payload for `POST /emissions/calc`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CalculateEmissionBody {
    pub category_code: Option<String>,
    pub quantity: Option<f64>,
    /// One of `g`, `kg`, `ml`, `l`, `piece`.
    pub quantity_unit: Option<String>,
    pub product_id: Option<String>,
    pub session_id: Option<String>,
    /// Used when the `Idempotency-Key` header is absent.
    pub idempotency_key: Option<String>,
}

/// Stored emission calculation.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmissionCalculationResponse {
    pub id: Uuid,
    pub product_id: Option<String>,
    pub category_code: String,
    pub quantity: f64,
    pub quantity_unit: String,
    pub normalized_qty: f64,
    pub factor_id: i64,
    pub emissions_gco2e: f64,
    pub method: String,
    pub session_id: Option<String>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    /// True when an earlier identical request was replayed.
    pub replayed: bool,
}

impl From<CalculateEmissionResponse> for EmissionCalculationResponse {
    fn from(value: CalculateEmissionResponse) -> Self {
        let EmissionCalculation {
            id,
            product_id,
            category_code,
            quantity,
            quantity_unit,
            normalized_qty,
            factor_id,
            emissions_gco2e,
            method,
            session_id,
            idempotency_key,
            created_at,
            ..
        } = value.calculation;
        Self {
            id,
            product_id,
            category_code,
            quantity,
            quantity_unit: quantity_unit.to_string(),
            normalized_qty,
            factor_id,
            emissions_gco2e,
            method,
            session_id,
            idempotency_key: idempotency_key.into(),
            created_at,
            replayed: value.replayed,
        }
    }
}

fn parse_calculation_input(body: &CalculateEmissionBody) -> Result<EmissionInput, Error> {
    let category_code = body
        .category_code
        .as_deref()
        .ok_or_else(|| missing_field_error(FieldName::new("category_code")))?;
    let quantity = body
        .quantity
        .ok_or_else(|| missing_field_error(FieldName::new("quantity")))?;
    let raw_unit = body
        .quantity_unit
        .as_deref()
        .ok_or_else(|| missing_field_error(FieldName::new("quantity_unit")))?;
    let unit: QuantityUnit = raw_unit.parse().map_err(|err: ParseQuantityUnitError| {
        invalid_value_error(FieldName::new("quantity_unit"), raw_unit, err.to_string())
    })?;
    EmissionInput::new(
        category_code,
        quantity,
        unit,
        body.product_id.clone(),
        body.session_id.clone(),
    )
    .map_err(|err| {
        let field = match err {
            EmissionInputError::EmptyCategory => "category_code",
            EmissionInputError::NonPositiveQuantity => "quantity",
        };
        Error::unprocessable(err.to_string()).with_details(json!({
            "field": field,
            "code": "invalid_value",
        }))
    })
}

/// Compute an emission for a quantity of a category.
///
/// Returns `201` for a new calculation and `200` when replayed.
#[utoipa::path(
    post,
    path = "/emissions/calc",
    request_body = CalculateEmissionBody,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Overrides the body key")
    ),
    responses(
        (status = 201, description = "Calculation stored", body = EmissionCalculationResponse),
        (status = 200, description = "Calculation replayed", body = EmissionCalculationResponse),
        (status = 404, description = "No emission factor", body = ErrorSchema),
        (status = 409, description = "Key reused with another payload", body = ErrorSchema),
        (status = 422, description = "Invalid input", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["emissions"],
    operation_id = "calculateEmission"
)]
#[post("/emissions/calc")]
pub async fn calculate_emission(
    state: web::Data<HttpState>,
    request: HttpRequest,
    payload: web::Json<CalculateEmissionBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let input = parse_calculation_input(&body)?;
    let idempotency_key =
        resolve_idempotency_key(request.headers(), body.idempotency_key.as_deref())?;
    let response = state
        .emissions
        .calculate(CalculateEmissionRequest {
            input,
            idempotency_key,
        })
        .await?;
    let mut builder = if response.replayed {
        HttpResponse::Ok()
    } else {
        HttpResponse::Created()
    };
    Ok(builder.json(EmissionCalculationResponse::from(response)))
}

/// Query parameters for `GET /emissions/history`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// `day`, `week` or `month`.
    pub interval: Option<String>,
    /// RFC 3339 lower bound.
    pub from: Option<String>,
    /// RFC 3339 upper bound.
    pub to: Option<String>,
    /// Comma list of `sum`, `avg`, `count`, `min`, `max`.
    pub metrics: Option<String>,
    /// `none`, `category`, `product`, `store` or `brand`.
    pub group_by: Option<String>,
    /// 1 to 1000, default 366.
    pub limit: Option<u32>,
    /// `json` or `csv`.
    pub format: Option<String>,
}

fn parse_history_query(params: &HistoryParams) -> Result<HistoryQuery, Error> {
    let interval_field = FieldName::new("interval");
    if params.interval.as_deref().is_none_or(|raw| raw.trim().is_empty()) {
        return Err(missing_field_error(interval_field));
    }
    let interval = parse_choice(params.interval.as_deref(), interval_field, Interval::Day)?;
    let metrics = parse_metrics(params.metrics.as_deref()).map_err(|err| {
        invalid_value_error(FieldName::new("metrics"), &err.value, err.to_string())
    })?;
    Ok(HistoryQuery {
        interval,
        from: parse_optional_rfc3339_timestamp(params.from.as_deref(), FieldName::new("from"))?,
        to: parse_optional_rfc3339_timestamp(params.to.as_deref(), FieldName::new("to"))?,
        metrics,
        group_by: parse_choice(
            params.group_by.as_deref(),
            FieldName::new("group_by"),
            HistoryGroupBy::None,
        )?,
        limit: bounded(
            params.limit,
            FieldName::new("limit"),
            1,
            MAX_AGGREGATE_LIMIT,
            DEFAULT_HISTORY_LIMIT,
        )?,
    })
}

/// One history bucket.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPointResponse {
    pub t: DateTime<Utc>,
    pub sum: Option<f64>,
    pub avg: Option<f64>,
    pub count: Option<i64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub group: Option<String>,
}

impl From<HistoryPoint> for HistoryPointResponse {
    fn from(value: HistoryPoint) -> Self {
        Self {
            t: value.t,
            sum: value.sum,
            avg: value.avg,
            count: value.count,
            min: value.min,
            max: value.max,
            group: value.group,
        }
    }
}

/// Totals across the series.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistorySummaryResponse {
    pub sum_total: f64,
    pub trend_slope_per_interval: f64,
    pub count_points: usize,
}

/// Response body for `GET /emissions/history`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub interval: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub group_by: String,
    pub metrics: Vec<String>,
    pub series: Vec<HistoryPointResponse>,
    pub summary: HistorySummaryResponse,
}

impl From<HistoryReport> for HistoryResponse {
    fn from(value: HistoryReport) -> Self {
        let HistoryReport {
            query,
            series,
            summary,
        } = value;
        Self {
            interval: query.interval.to_string(),
            from: query.from,
            to: query.to,
            group_by: query.group_by.to_string(),
            metrics: query.metrics.iter().map(ToString::to_string).collect(),
            series: series.into_iter().map(Into::into).collect(),
            summary: HistorySummaryResponse {
                sum_total: summary.sum_total,
                trend_slope_per_interval: summary.trend_slope_per_interval,
                count_points: summary.count_points,
            },
        }
    }
}

fn history_csv(report: &HistoryReport) -> String {
    let mut writer = CsvWriter::with_header(&["t", "sum", "avg", "count", "min", "max", "group"]);
    for point in &report.series {
        writer.row([
            point.t.to_rfc3339(),
            cell(point.sum),
            cell(point.avg),
            cell(point.count),
            cell(point.min),
            cell(point.max),
            cell(point.group.as_deref()),
        ]);
    }
    writer.finish()
}

/// Emissions over time.
#[utoipa::path(
    get,
    path = "/emissions/history",
    params(HistoryParams),
    responses(
        (status = 200, description = "Series as JSON or CSV", body = HistoryResponse),
        (status = 422, description = "Invalid parameters", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["emissions"],
    operation_id = "emissionHistory"
)]
#[get("/emissions/history")]
pub async fn emission_history(
    state: web::Data<HttpState>,
    request: HttpRequest,
    params: web::Query<HistoryParams>,
) -> ApiResult<HttpResponse> {
    let format = negotiate(params.format.as_deref(), request.headers())?;
    let query = parse_history_query(&params)?;
    let report = state.reports.history(query).await?;
    Ok(match format {
        ResponseFormat::Csv => csv_response(history_csv(&report), "emissions_history.csv"),
        ResponseFormat::Json => HttpResponse::Ok().json(HistoryResponse::from(report)),
    })
}

/// Query parameters for `GET /emissions/summary`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryParams {
    pub category_code: Option<String>,
    /// YYYY-MM-DD, inclusive.
    pub start_date: Option<String>,
    /// YYYY-MM-DD, inclusive.
    pub end_date: Option<String>,
    /// `total_emission`, `avg_emission`, `min_emission` or `max_emission`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub order: Option<String>,
    /// 1 to 1000, default 100.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// `json` or `csv`.
    pub format: Option<String>,
}

fn parse_summary_query(params: &SummaryParams) -> Result<SummaryQuery, Error> {
    Ok(SummaryQuery {
        category_code: params
            .category_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_owned),
        range: parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?,
        sort_by: parse_choice(
            params.sort_by.as_deref(),
            FieldName::new("sort_by"),
            SummarySort::TotalEmission,
        )?,
        order: parse_choice(params.order.as_deref(), FieldName::new("order"), SortOrder::Desc)?,
        limit: bounded(
            params.limit,
            FieldName::new("limit"),
            1,
            MAX_AGGREGATE_LIMIT,
            DEFAULT_SUMMARY_LIMIT,
        )?,
        offset: params.offset.unwrap_or_default(),
    })
}

/// Aggregates for one category.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryAggregateResponse {
    pub category_code: String,
    pub subcategory_code: Option<String>,
    pub avg_emission: f64,
    pub min_emission: f64,
    pub max_emission: f64,
    pub total_emission: f64,
}

impl From<CategoryAggregate> for CategoryAggregateResponse {
    fn from(value: CategoryAggregate) -> Self {
        Self {
            category_code: value.category_code,
            subcategory_code: value.subcategory_code,
            avg_emission: value.avg_emission,
            min_emission: value.min_emission,
            max_emission: value.max_emission,
            total_emission: value.total_emission,
        }
    }
}

/// Echo of the accepted summary parameters.
#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryParamsResponse {
    pub category_code: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sort_by: String,
    pub order: String,
    pub limit: u32,
    pub offset: u32,
}

/// Response body for `GET /emissions/summary`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    pub params: SummaryParamsResponse,
    pub summary: Vec<CategoryAggregateResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

const SUMMARY_COLUMNS: [&str; 6] = [
    "category_code",
    "subcategory_code",
    "avg_emission",
    "min_emission",
    "max_emission",
    "total_emission",
];

fn summary_csv(items: &[CategoryAggregate]) -> String {
    let mut writer = CsvWriter::with_header(&SUMMARY_COLUMNS);
    for item in items {
        writer.row([
            item.category_code.clone(),
            cell(item.subcategory_code.as_deref()),
            item.avg_emission.to_string(),
            item.min_emission.to_string(),
            item.max_emission.to_string(),
            item.total_emission.to_string(),
        ]);
    }
    writer.finish()
}

/// Emission statistics per category.
#[utoipa::path(
    get,
    path = "/emissions/summary",
    params(SummaryParams),
    responses(
        (status = 200, description = "Summary as JSON or CSV", body = SummaryResponse),
        (status = 422, description = "Invalid parameters", body = ErrorSchema)
    ),
    tags = ["emissions"],
    operation_id = "emissionSummary"
)]
#[get("/emissions/summary")]
pub async fn emission_summary(
    state: web::Data<HttpState>,
    request: HttpRequest,
    params: web::Query<SummaryParams>,
) -> ApiResult<HttpResponse> {
    let format = negotiate(params.format.as_deref(), request.headers())?;
    let query = parse_summary_query(&params)?;
    let echo = SummaryParamsResponse {
        category_code: query.category_code.clone(),
        start_date: query.range.start(),
        end_date: query.range.end(),
        sort_by: query.sort_by.to_string(),
        order: query.order.to_string(),
        limit: query.limit,
        offset: query.offset,
    };
    let report = state.reports.summary(query).await?;
    Ok(match format {
        ResponseFormat::Csv => csv_response(summary_csv(&report.items), "emissions_summary.csv"),
        ResponseFormat::Json => HttpResponse::Ok().json(SummaryResponse {
            params: echo,
            summary: report.items.into_iter().map(Into::into).collect(),
            note: report.note,
        }),
    })
}

/// Query parameters for `GET /emissions/summary_groups`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryGroupsParams {
    /// Comma separated group identifiers.
    pub group_ids: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `json` or `csv`.
    pub format: Option<String>,
}

/// Echo of the accepted group summary parameters.
#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryGroupsParamsResponse {
    pub group_ids: Vec<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Aggregates for one group.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupSummaryResponse {
    pub group_id: i64,
    pub items: Vec<CategoryAggregateResponse>,
}

impl From<GroupCategorySummary> for GroupSummaryResponse {
    fn from(value: GroupCategorySummary) -> Self {
        Self {
            group_id: value.group_id,
            items: value.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response body for `GET /emissions/summary_groups`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryGroupsResponse {
    pub params: SummaryGroupsParamsResponse,
    pub series: Vec<GroupSummaryResponse>,
}

fn summary_groups_csv(series: &[GroupCategorySummary]) -> String {
    let mut writer = CsvWriter::with_header(&[
        "group_id",
        "category_code",
        "avg_emission",
        "min_emission",
        "max_emission",
        "total_emission",
    ]);
    for group in series {
        for item in &group.items {
            writer.row([
                group.group_id.to_string(),
                item.category_code.clone(),
                item.avg_emission.to_string(),
                item.min_emission.to_string(),
                item.max_emission.to_string(),
                item.total_emission.to_string(),
            ]);
        }
    }
    writer.finish()
}

/// Per-category statistics for the sessions of each group.
#[utoipa::path(
    get,
    path = "/emissions/summary_groups",
    params(SummaryGroupsParams),
    responses(
        (status = 200, description = "One series per group", body = SummaryGroupsResponse),
        (status = 422, description = "Invalid parameters", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["emissions", "groups"],
    operation_id = "emissionSummaryGroups"
)]
#[get("/emissions/summary_groups")]
pub async fn emission_summary_groups(
    state: web::Data<HttpState>,
    request: HttpRequest,
    params: web::Query<SummaryGroupsParams>,
) -> ApiResult<HttpResponse> {
    let format = negotiate(params.format.as_deref(), request.headers())?;
    let group_ids = parse_id_list(params.group_ids.as_deref(), FieldName::new("group_ids"))?;
    let range: DateRange =
        parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let series = state
        .reports
        .summary_groups(group_ids.clone(), range)
        .await?;
    Ok(match format {
        ResponseFormat::Csv => csv_response(summary_groups_csv(&series), "emissions_summary_groups.csv"),
        ResponseFormat::Json => HttpResponse::Ok().json(SummaryGroupsResponse {
            params: SummaryGroupsParamsResponse {
                group_ids,
                start_date: range.start(),
                end_date: range.end(),
            },
            series: series.into_iter().map(Into::into).collect(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregation::{HistorySummary, Metric, SummaryReport};
    use crate::domain::ports::{MockEmissionCommand, MockEmissionReportQuery};
    use crate::domain::{IdempotencyKey, canonicalize_and_hash};
    use actix_web::http::StatusCode;
    use actix_web::http::header::{ACCEPT, CONTENT_TYPE};
    use actix_web::{App, test as actix_test};
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::Value;
    use std::sync::Arc;

    fn calculation(key: &str) -> EmissionCalculation {
        EmissionCalculation {
            id: Uuid::nil(),
            product_id: None,
            category_code: "dairy".to_owned(),
            quantity: 500.0,
            quantity_unit: QuantityUnit::Grams,
            normalized_qty: 0.5,
            factor_id: 3,
            emissions_gco2e: 600.0,
            method: "direct_factor".to_owned(),
            session_id: Some("s-1".to_owned()),
            idempotency_key: IdempotencyKey::new(key).expect("key"),
            payload_hash: canonicalize_and_hash(&json!({})),
            created_at: Utc.with_ymd_and_hms(2025, 11, 19, 10, 30, 0).single().expect("ts"),
        }
    }

    fn state_with_reports(reports: MockEmissionReportQuery) -> HttpState {
        HttpState {
            reports: Arc::new(reports),
            ..HttpState::default()
        }
    }

    #[rstest]
    #[case(false, StatusCode::CREATED)]
    #[case(true, StatusCode::OK)]
    #[actix_web::test]
    async fn calc_status_reflects_replay(#[case] replayed: bool, #[case] expected: StatusCode) {
        let mut command = MockEmissionCommand::new();
        command
            .expect_calculate()
            .withf(|request| {
                request.idempotency_key.as_ref() == "header-key"
                    && request.input.unit() == QuantityUnit::Grams
            })
            .times(1)
            .return_once(move |_| {
                Ok(CalculateEmissionResponse {
                    calculation: calculation("header-key"),
                    replayed,
                })
            });
        let state = HttpState {
            emissions: Arc::new(command),
            ..HttpState::default()
        };
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(calculate_emission),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/emissions/calc")
                .insert_header(("Idempotency-Key", "header-key"))
                .set_json(json!({
                    "category_code": "dairy",
                    "quantity": 500,
                    "quantity_unit": "g",
                    "idempotency_key": "body-key",
                }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), expected);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["replayed"], replayed);
        assert_eq!(body["quantity_unit"], "g");
    }

    #[rstest]
    #[case(json!({"category_code": "dairy", "quantity": 1, "quantity_unit": "g"}))]
    #[case(json!({"category_code": "dairy", "quantity": 0, "quantity_unit": "g", "idempotency_key": "k"}))]
    #[case(json!({"category_code": "dairy", "quantity": 1, "quantity_unit": "tonne", "idempotency_key": "k"}))]
    #[case(json!({"quantity": 1, "quantity_unit": "g", "idempotency_key": "k"}))]
    #[actix_web::test]
    async fn calc_rejects_invalid_bodies(#[case] body: Value) {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::default()))
                .service(calculate_emission),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/emissions/calc")
                .set_json(body)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[rstest]
    fn history_requires_interval() {
        let error = parse_history_query(&HistoryParams::default()).expect_err("missing interval");
        assert_eq!(
            error.details().and_then(|d| d.get("code")).and_then(Value::as_str),
            Some("missing_field")
        );
    }

    #[rstest]
    fn history_applies_defaults() {
        let query = parse_history_query(&HistoryParams {
            interval: Some("week".to_owned()),
            ..HistoryParams::default()
        })
        .expect("valid");
        assert_eq!(query.interval, Interval::Week);
        assert_eq!(query.metrics, vec![Metric::Sum, Metric::Count]);
        assert_eq!(query.group_by, HistoryGroupBy::None);
        assert_eq!(query.limit, DEFAULT_HISTORY_LIMIT);
    }

    #[actix_web::test]
    async fn history_renders_csv_when_accepted() {
        let mut reports = MockEmissionReportQuery::new();
        reports.expect_history().times(1).returning(|query| {
            let series = vec![HistoryPoint {
                t: Utc.with_ymd_and_hms(2025, 11, 17, 0, 0, 0).single().expect("ts"),
                sum: Some(12.5),
                count: Some(2),
                ..HistoryPoint::default()
            }];
            Ok(HistoryReport {
                query,
                summary: HistorySummary::of(&series),
                series,
            })
        });
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state_with_reports(reports)))
                .service(emission_history),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/emissions/history?interval=week")
                .insert_header((ACCEPT, "text/csv"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        assert!(content_type.starts_with("text/csv"));
        let body = actix_test::read_body(response).await;
        assert_eq!(
            std::str::from_utf8(&body).expect("utf8"),
            "t,sum,avg,count,min,max,group\r\n2025-11-17T00:00:00+00:00,12.5,,2,,,\r\n"
        );
    }

    #[actix_web::test]
    async fn history_rejects_unknown_format() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::default()))
                .service(emission_history),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/emissions/history?interval=day&format=xml")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn summary_passes_note_through() {
        let mut reports = MockEmissionReportQuery::new();
        reports
            .expect_summary()
            .withf(|query| query.order == SortOrder::Asc && query.limit == 5)
            .times(1)
            .return_once(|_| {
                Ok(SummaryReport {
                    items: Vec::new(),
                    note: Some("Aggregation skipped".to_owned()),
                })
            });
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state_with_reports(reports)))
                .service(emission_summary),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/emissions/summary?order=asc&limit=5")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["note"], "Aggregation skipped");
        assert_eq!(body["params"]["sort_by"], "total_emission");
        assert_eq!(body["summary"], json!([]));
    }

    #[actix_web::test]
    async fn summary_rejects_inverted_dates() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::default()))
                .service(emission_summary),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/emissions/summary?start_date=2025-02-01&end_date=2025-01-01")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn summary_groups_returns_one_series_per_group() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::default()))
                .service(emission_summary_groups),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/emissions/summary_groups?group_ids=2,1,2")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["params"]["group_ids"], json!([2, 1]));
        assert_eq!(body["series"][1]["group_id"], 1);
    }
}
