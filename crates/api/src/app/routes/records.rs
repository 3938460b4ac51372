use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use larder_core::RecordId;
use larder_infra::store::RecordQuery;

use crate::app::dto::{self, RecordsView};
use crate::app::errors;
use crate::app::routes::today;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_record).get(list_records))
        .route("/summary", get(summary))
        .route("/generate-missing", post(generate_missing))
        .route("/update-unit-fields", post(sync_units))
        .route("/:id", get(get_record).put(update_record).delete(delete_record))
}

fn parse_id(id: &str) -> Result<RecordId, axum::response::Response> {
    id.parse::<RecordId>().map_err(errors::domain_error_to_response)
}

pub async fn create_record(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RecordRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let draft = match body.into_draft(today()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.create_record(draft).await {
        Ok(record) => (StatusCode::CREATED, Json(json!({ "data": record }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::RecordsParams>,
) -> axum::response::Response {
    let view = match params.into_view() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match view {
        RecordsView::Day(date) => match services.ledger.query_records(&RecordQuery::day(date)).await {
            Ok(page) => (
                StatusCode::OK,
                Json(json!({ "count": page.records.len(), "data": page.records })),
            )
                .into_response(),
            Err(e) => errors::service_error_to_response(e),
        },
        RecordsView::Month { start, end } => match services.ledger.monthly_totals(start, end).await {
            Ok(totals) => (StatusCode::OK, Json(json!({ "count": totals.len(), "data": totals }))).into_response(),
            Err(e) => errors::service_error_to_response(e),
        },
        RecordsView::List(query) => match services.ledger.query_records(&query).await {
            Ok(page) => {
                let (current_page, limit) = page.page.map(|p| (p.page, p.limit)).unwrap_or((1, 0));
                (
                    StatusCode::OK,
                    Json(json!({
                        "data": &page.records,
                        "pagination": {
                            "currentPage": current_page,
                            "limit": limit,
                            "totalPages": page.total_pages(),
                            "totalRecords": page.total,
                            "hasNextPage": page.has_next_page(),
                            "hasPrevPage": current_page > 1,
                        },
                    })),
                )
                    .into_response()
            }
            Err(e) => errors::service_error_to_response(e),
        },
    }
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SummaryParams>,
) -> axum::response::Response {
    let (from, to) = match params.range() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.summary(from, to).await {
        Ok(summary) => (StatusCode::OK, Json(json!({ "data": summary }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn generate_missing(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::GenerateMissingRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let date = match body.date() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.generate_missing(date, today()).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "message": format!(
                    "generated {} and refreshed {} records for {date}",
                    report.generated, report.refreshed
                ),
                "data": report,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn sync_units(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.sync_record_units().await {
        Ok(report) => (StatusCode::OK, Json(json!({ "data": report }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledger.get_record(id).await {
        Ok(record) => (StatusCode::OK, Json(json!({ "data": record }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_record(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::RecordRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let existing = match services.ledger.get_record(id).await {
        Ok(r) => r,
        Err(e) => return errors::service_error_to_response(e),
    };
    let draft = match body.into_draft(existing.date()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.update_record(id, draft).await {
        Ok(record) => (StatusCode::OK, Json(json!({ "data": record }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_record(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledger.delete_record(id).await {
        Ok(record) => (
            StatusCode::OK,
            Json(json!({ "message": "inventory record deleted", "data": record })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
