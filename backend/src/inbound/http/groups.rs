//! Group management and group comparison handlers.
//!
//! ```text
//! POST   /groups                         Create a group
//! GET    /groups                         List groups, optionally by owner
//! DELETE /groups/{id}                    Delete a group and its sessions
//! POST   /groups/{id}/sessions           Attach a session
//! DELETE /groups/{id}/sessions/{sid}     Detach a session
//! GET    /groups/compare                 Rank groups by emissions
//! ```

use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::domain::aggregation::{
    GroupBucket, GroupCompareQuery, GroupComparison, GroupComparisonRow, Interval,
    RankedGroupSeries,
};
use crate::domain::group::{Group, GroupValidationError, NewGroup, SessionId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::content::{CsvWriter, ResponseFormat, cell, csv_response, negotiate};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, parse_choice, parse_date_range, parse_id_list,
};

fn map_group_validation(err: GroupValidationError) -> Error {
    let field = match err {
        GroupValidationError::EmptyName | GroupValidationError::NameTooLong => "name",
        GroupValidationError::EmptySession => "session_id",
    };
    Error::unprocessable(err.to_string()).with_details(json!({
        "field": field,
        "code": "invalid_value",
    }))
}

/// Request payload for `POST /groups`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateGroupRequest {
    pub owner_id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Group representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: i64,
    pub owner_id: Option<String>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Group> for GroupResponse {
    fn from(value: Group) -> Self {
        Self {
            id: value.id,
            owner_id: value.owner_id,
            name: value.name,
            created_at: value.created_at,
        }
    }
}

/// Query parameters for `GET /groups`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListGroupsQuery {
    pub owner_id: Option<String>,
}

/// Request payload for `POST /groups/{id}/sessions`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddSessionRequest {
    #[serde(default)]
    pub session_id: String,
}

/// Create a group.
#[utoipa::path(
    post,
    path = "/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupResponse),
        (status = 422, description = "Invalid group", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "createGroup"
)]
#[post("/groups")]
pub async fn create_group(
    state: web::Data<HttpState>,
    payload: web::Json<CreateGroupRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let group = NewGroup::new(payload.owner_id, &payload.name).map_err(map_group_validation)?;
    let created = state.groups.create(group).await?;
    Ok(HttpResponse::Created().json(GroupResponse::from(created)))
}

/// List groups, newest first.
#[utoipa::path(
    get,
    path = "/groups",
    params(ListGroupsQuery),
    responses((status = 200, description = "Groups", body = [GroupResponse])),
    tags = ["groups"],
    operation_id = "listGroups"
)]
#[get("/groups")]
pub async fn list_groups(
    state: web::Data<HttpState>,
    query: web::Query<ListGroupsQuery>,
) -> ApiResult<web::Json<Vec<GroupResponse>>> {
    let owner_id = query
        .into_inner()
        .owner_id
        .map(|owner| owner.trim().to_owned())
        .filter(|owner| !owner.is_empty());
    let groups = state.groups_query.list(owner_id).await?;
    Ok(web::Json(groups.into_iter().map(Into::into).collect()))
}

/// Delete a group and its session links.
#[utoipa::path(
    delete,
    path = "/groups/{group_id}",
    params(("group_id" = i64, Path, description = "Group id")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 404, description = "Group not found", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "deleteGroup"
)]
#[delete("/groups/{group_id}")]
pub async fn delete_group(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state.groups.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Attach a session to a group; duplicates are ignored.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/sessions",
    params(("group_id" = i64, Path, description = "Group id")),
    request_body = AddSessionRequest,
    responses(
        (status = 204, description = "Session attached"),
        (status = 404, description = "Group not found", body = ErrorSchema),
        (status = 422, description = "Invalid session id", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "addGroupSession"
)]
#[post("/groups/{group_id}/sessions")]
pub async fn add_group_session(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    payload: web::Json<AddSessionRequest>,
) -> ApiResult<HttpResponse> {
    let session_id = SessionId::new(&payload.session_id).map_err(map_group_validation)?;
    state
        .groups
        .add_session(path.into_inner(), session_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Detach a session from a group.
#[utoipa::path(
    delete,
    path = "/groups/{group_id}/sessions/{session_id}",
    params(
        ("group_id" = i64, Path, description = "Group id"),
        ("session_id" = String, Path, description = "Session id")
    ),
    responses((status = 204, description = "Session detached")),
    tags = ["groups"],
    operation_id = "removeGroupSession"
)]
#[delete("/groups/{group_id}/sessions/{session_id}")]
pub async fn remove_group_session(
    state: web::Data<HttpState>,
    path: web::Path<(i64, String)>,
) -> ApiResult<HttpResponse> {
    let (group_id, raw_session) = path.into_inner();
    let session_id = SessionId::new(&raw_session).map_err(map_group_validation)?;
    state.groups.remove_session(group_id, session_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Query parameters for `GET /groups/compare`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompareGroupsParams {
    /// Comma separated group identifiers.
    pub ids: Option<String>,
    /// `week` (default) or `month`.
    pub interval: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `json` or `csv`.
    pub format: Option<String>,
}

fn parse_compare_query(params: &CompareGroupsParams) -> Result<GroupCompareQuery, Error> {
    let field = FieldName::new("interval");
    let interval = parse_choice(params.interval.as_deref(), field, Interval::Week)?;
    if interval == Interval::Day {
        return Err(invalid_value_error(
            field,
            interval.as_str(),
            r#"interval must be "week" or "month""#,
        ));
    }
    Ok(GroupCompareQuery {
        group_ids: parse_id_list(params.ids.as_deref(), FieldName::new("ids"))?,
        interval,
        range: parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?,
    })
}

/// Echo of the accepted comparison parameters.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompareGroupsParamsResponse {
    pub ids: Vec<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub interval: String,
    pub format: String,
}

/// One bucket of a group's series.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupBucketResponse {
    pub bucket_start: NaiveDate,
    pub total_emission: f64,
    pub avg_emission: f64,
}

impl From<GroupBucket> for GroupBucketResponse {
    fn from(value: GroupBucket) -> Self {
        Self {
            bucket_start: value.bucket_start,
            total_emission: value.total_emission,
            avg_emission: value.avg_emission,
        }
    }
}

/// Ranked group series.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupSeriesResponse {
    pub group_id: i64,
    pub interval: String,
    pub low_co2_rank: u32,
    pub trend_slope: f64,
    pub items: Vec<GroupBucketResponse>,
}

impl From<RankedGroupSeries> for GroupSeriesResponse {
    fn from(value: RankedGroupSeries) -> Self {
        Self {
            group_id: value.group_id,
            interval: value.interval.to_string(),
            low_co2_rank: value.low_co2_rank,
            trend_slope: value.trend_slope,
            items: value.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Period statistics against the best group.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupComparisonRowResponse {
    pub group_id: i64,
    pub low_co2_rank: u32,
    pub period_total: f64,
    pub period_avg: f64,
    pub trend_slope: f64,
    pub diff_abs_total: f64,
    /// Percent; null when the best total is zero.
    pub diff_rel_total: Option<f64>,
}

impl From<GroupComparisonRow> for GroupComparisonRowResponse {
    fn from(value: GroupComparisonRow) -> Self {
        Self {
            group_id: value.group_id,
            low_co2_rank: value.low_co2_rank,
            period_total: value.period_total,
            period_avg: value.period_avg,
            trend_slope: value.trend_slope,
            diff_abs_total: value.diff_abs_total,
            diff_rel_total: value.diff_rel_total,
        }
    }
}

/// Response body for `GET /groups/compare`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompareGroupsResponse {
    pub params: CompareGroupsParamsResponse,
    pub series: Vec<GroupSeriesResponse>,
    pub comparison: Vec<GroupComparisonRowResponse>,
}

fn comparison_csv(comparison: &GroupComparison) -> String {
    let mut writer = CsvWriter::with_header(&[
        "group_id",
        "interval",
        "low_co2_rank",
        "bucket_start",
        "total_emission",
        "avg_emission",
    ]);
    for series in &comparison.series {
        for bucket in &series.items {
            writer.row([
                series.group_id.to_string(),
                series.interval.to_string(),
                series.low_co2_rank.to_string(),
                bucket.bucket_start.to_string(),
                bucket.total_emission.to_string(),
                bucket.avg_emission.to_string(),
            ]);
        }
    }
    writer.blank_line();
    writer.row(
        [
            "group_id",
            "low_co2_rank",
            "period_total",
            "period_avg",
            "trend_slope",
            "diff_abs_total",
            "diff_rel_total(%)",
        ]
        .map(str::to_owned),
    );
    for row in &comparison.comparison {
        writer.row([
            row.group_id.to_string(),
            row.low_co2_rank.to_string(),
            row.period_total.to_string(),
            row.period_avg.to_string(),
            row.trend_slope.to_string(),
            row.diff_abs_total.to_string(),
            cell(row.diff_rel_total),
        ]);
    }
    writer.finish()
}

/// Rank groups by total emissions over a period.
#[utoipa::path(
    get,
    path = "/groups/compare",
    params(CompareGroupsParams),
    responses(
        (status = 200, description = "Ranked comparison as JSON or CSV", body = CompareGroupsResponse),
        (status = 422, description = "Invalid parameters", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "compareGroups"
)]
#[get("/groups/compare")]
pub async fn compare_groups(
    state: web::Data<HttpState>,
    request: HttpRequest,
    params: web::Query<CompareGroupsParams>,
) -> ApiResult<HttpResponse> {
    let format = negotiate(params.format.as_deref(), request.headers())?;
    let query = parse_compare_query(&params)?;
    let echo = CompareGroupsParamsResponse {
        ids: query.group_ids.clone(),
        start_date: query.range.start(),
        end_date: query.range.end(),
        interval: query.interval.to_string(),
        format: match format {
            ResponseFormat::Json => "json".to_owned(),
            ResponseFormat::Csv => "csv".to_owned(),
        },
    };
    let comparison = state.reports.compare_groups(query).await?;
    Ok(match format {
        ResponseFormat::Csv => csv_response(comparison_csv(&comparison), "groups_compare.csv"),
        ResponseFormat::Json => HttpResponse::Ok().json(CompareGroupsResponse {
            params: echo,
            series: comparison.series.into_iter().map(Into::into).collect(),
            comparison: comparison.comparison.into_iter().map(Into::into).collect(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregation::{GroupSeries, compare_groups as rank_groups};
    use crate::domain::ports::{MockEmissionReportQuery, MockGroupCommand};
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::Value;
    use std::sync::Arc;

    fn bucket(day: u32, total: f64) -> GroupBucket {
        GroupBucket {
            bucket_start: NaiveDate::from_ymd_opt(2025, 11, day).expect("date"),
            total_emission: total,
            avg_emission: total / 2.0,
        }
    }

    fn reports() -> MockEmissionReportQuery {
        let mut reports = MockEmissionReportQuery::new();
        reports.expect_compare_groups().returning(|query| {
            Ok(rank_groups(
                query.interval,
                vec![
                    GroupSeries {
                        group_id: 1,
                        items: vec![bucket(3, 40.0), bucket(10, 60.0)],
                    },
                    GroupSeries {
                        group_id: 2,
                        items: vec![bucket(3, 30.0), bucket(10, 20.0)],
                    },
                ],
            ))
        });
        reports
    }

    #[actix_web::test]
    async fn create_group_returns_created() {
        let mut command = MockGroupCommand::new();
        command
            .expect_create()
            .withf(|group| group.name() == "Famille")
            .times(1)
            .return_once(|_| {
                Ok(Group {
                    id: 4,
                    owner_id: Some("u1".to_owned()),
                    name: "Famille".to_owned(),
                    created_at: Utc::now(),
                })
            });
        let state = HttpState {
            groups: Arc::new(command),
            ..HttpState::default()
        };
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(create_group),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/groups")
                .set_json(json!({"owner_id": "u1", "name": " Famille "}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn create_group_rejects_blank_name() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::default()))
                .service(create_group),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/groups")
                .set_json(json!({"name": "  "}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[rstest]
    #[case("/groups/9", StatusCode::NOT_FOUND)]
    #[case("/groups/9/sessions/s-1", StatusCode::NO_CONTENT)]
    #[actix_web::test]
    async fn deletes_map_fixture_outcomes(#[case] uri: &str, #[case] expected: StatusCode) {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::default()))
                .service(delete_group)
                .service(remove_group_session),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete().uri(uri).to_request(),
        )
        .await;
        assert_eq!(response.status(), expected);
    }

    #[actix_web::test]
    async fn add_session_returns_no_content() {
        let mut command = MockGroupCommand::new();
        command
            .expect_add_session()
            .withf(|group_id, session| *group_id == 3 && session.as_str() == "s-42")
            .times(1)
            .return_once(|_, _| Ok(()));
        let state = HttpState {
            groups: Arc::new(command),
            ..HttpState::default()
        };
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(add_group_session),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/groups/3/sessions")
                .set_json(json!({"session_id": "s-42"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn compare_ranks_lowest_total_first() {
        let state = HttpState {
            reports: Arc::new(reports()),
            ..HttpState::default()
        };
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(compare_groups),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/groups/compare?ids=1,2&interval=week")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["comparison"][0]["group_id"], 2);
        assert_eq!(body["comparison"][0]["low_co2_rank"], 1);
        assert_eq!(body["comparison"][0]["diff_abs_total"], 0.0);
        assert_eq!(body["comparison"][1]["diff_rel_total"], 100.0);
        assert_eq!(body["params"]["format"], "json");
    }

    #[actix_web::test]
    async fn compare_csv_has_two_sections() {
        let state = HttpState {
            reports: Arc::new(reports()),
            ..HttpState::default()
        };
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(compare_groups),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/groups/compare?ids=1,2&format=csv")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = actix_test::read_body(response).await;
        let text = std::str::from_utf8(&body).expect("utf8");
        let sections: Vec<&str> = text.split("\r\n\r\n").collect();
        assert_eq!(sections.len(), 2);
        assert!(sections[0].starts_with("group_id,interval,low_co2_rank,bucket_start"));
        assert!(sections[1].starts_with("group_id,low_co2_rank,period_total"));
        assert!(sections[1].contains("2,1,50,12.5,-10,0,0"));
    }

    #[rstest]
    #[case("ids=1&interval=day")]
    #[case("interval=week")]
    #[case("ids=1&start_date=2025-03-01&end_date=2025-01-01")]
    fn compare_rejects_invalid_parameters(#[case] raw: &str) {
        let params = web::Query::<CompareGroupsParams>::from_query(raw).expect("query string parses");
        let error = parse_compare_query(&params).expect_err("rejected");
        assert_eq!(error.code(), crate::domain::ErrorCode::UnprocessableEntity);
    }
}
