use axum::Router;

pub mod common;
pub mod dashboard;
pub mod finances;
pub mod inventory;
pub mod invoices;
pub mod pos;
pub mod products;
pub mod sales;
pub mod settings;
pub mod staff;
pub mod system;

/// Router for all ledger endpoints (operator context attached by middleware).
pub fn router() -> Router {
    Router::new()
        .nest("/dashboard", dashboard::router())
        .nest("/products", products::router())
        .nest("/inventory", inventory::router())
        .nest("/pos", pos::router())
        .nest("/sales", sales::router())
        .nest("/invoices", invoices::router())
        .nest("/finances", finances::router())
        .nest("/settings", settings::router())
        .nest("/staff", staff::router())
}
