use axum::Router;

pub mod inventory;
pub mod records;
pub mod system;

/// Router for all resource endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/inventory", inventory::router())
        .nest("/inventory-records", records::router())
}

/// The kitchen's calendar day.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
