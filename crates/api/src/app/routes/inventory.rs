use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use larder_core::{DomainError, ItemId};
use larder_infra::Upserted;

use crate::app::routes::today;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(add_item).get(list_items))
        .route("/bulk", post(add_items))
        .route("/prepare-next-day", post(prepare_next_day))
        .route("/create-record", post(upsert_day_record))
        .route("/repair", post(repair_items))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
}

fn parse_id(id: &str) -> Result<ItemId, axum::response::Response> {
    id.parse::<ItemId>().map_err(errors::domain_error_to_response)
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let (id, draft) = match body.into_draft() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.add_item(id, draft).await {
        Ok(item) => (StatusCode::CREATED, Json(json!({ "data": item }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_items(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::BulkItemsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    if body.items.is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "expected a non-empty array of items",
        );
    }

    let mut drafts = Vec::with_capacity(body.items.len());
    for (index, req) in body.items.into_iter().enumerate() {
        match req.into_draft() {
            Ok(d) => drafts.push(d),
            Err(e) => {
                let e = match e {
                    DomainError::Validation(msg) => DomainError::validation(format!("item {}: {msg}", index + 1)),
                    other => other,
                };
                return errors::domain_error_to_response(e);
            }
        }
    }

    match services.ledger.add_items(drafts).await {
        Ok(items) => (
            StatusCode::CREATED,
            Json(json!({ "count": items.len(), "data": items })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.list_items().await {
        Ok(items) => (StatusCode::OK, Json(json!({ "count": items.len(), "data": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledger.get_item(id).await {
        Ok(item) => (StatusCode::OK, Json(json!({ "data": item }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::ItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    // The path decides which item is overwritten; a body id is ignored.
    let draft = match body.into_draft() {
        Ok((_, draft)) => draft,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.update_item(id, draft, today()).await {
        Ok(item) => (StatusCode::OK, Json(json!({ "data": item }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledger.delete_item(id).await {
        Ok(item) => (
            StatusCode::OK,
            Json(json!({ "message": "inventory item deleted", "data": item })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn prepare_next_day(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.prepare_next_day(today()).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("prepared {} items for the next day", report.succeeded),
                "data": report,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn upsert_day_record(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::DayEntryRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let (item_name, date, entry) = match body.into_parts() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.upsert_day_record(&item_name, date, entry).await {
        Ok((record, Upserted::Created)) => (StatusCode::CREATED, Json(json!({ "data": record }))).into_response(),
        Ok((record, Upserted::Updated)) => (StatusCode::OK, Json(json!({ "data": record }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn repair_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.repair_items().await {
        Ok(report) => (StatusCode::OK, Json(json!({ "data": report }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
