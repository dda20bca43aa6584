//! HTTP API

use std::sync::Arc;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;
use crate::catalog::{Catalog, StockSnapshot};
use crate::domain::aggregates::variant::Variant;
use crate::domain::ports::{EventPublisher, OnHandInventory, VariantRepository};
use crate::domain::services::aggregator::{self, BreakdownRow};
use crate::domain::services::editor::{self, EditCommand};
use crate::domain::services::validation::{self, ProductIssues, ValidationReport};
use crate::domain::value_objects::ValueAddress;
use crate::VariantError;

pub struct AppState<S, P> {
    pub catalog: Arc<Catalog<S, P>>,
}

impl<S, P> Clone for AppState<S, P> {
    fn clone(&self) -> Self { Self { catalog: Arc::clone(&self.catalog) } }
}

pub fn router<S, P>(catalog: Catalog<S, P>) -> Router
where
    S: VariantRepository + OnHandInventory + 'static,
    P: EventPublisher + 'static,
{
    let state = AppState { catalog: Arc::new(catalog) };
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "opensase-variants"})) }))
        .route("/api/v1/variants/validate", post(validate::<S, P>))
        .route("/api/v1/variants/clean", post(clean::<S, P>))
        .route("/api/v1/variants/issues", post(issues))
        .route("/api/v1/variants/summary", post(summary))
        .route("/api/v1/variants/edit", post(edit::<S, P>))
        .route("/api/v1/products/:id/variants", get(get_variants::<S, P>).put(save_variants::<S, P>))
        .route("/api/v1/products/:id/variants/withdraw", post(withdraw::<S, P>))
        .route("/api/v1/products/:id/variants/export", get(export::<S, P>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error body: `{"error": ..}` plus `{"errors": [..]}` for rejected trees.
pub struct ApiError(VariantError);

impl From<VariantError> for ApiError {
    fn from(e: VariantError) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VariantError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            VariantError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            VariantError::Edit(_) | VariantError::Stock(_) => StatusCode::CONFLICT,
            VariantError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(err = %self.0, "request failed");
        }
        let body = match &self.0 {
            VariantError::Invalid(errors) => json!({"error": "invalid variants", "errors": errors}),
            other => json!({"error": other.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn validate<S, P>(State(s): State<AppState<S, P>>, Json(body): Json<Value>) -> Json<ValidationReport>
where
    S: VariantRepository + OnHandInventory,
    P: EventPublisher,
{
    Json(validation::validate_product(&body, s.catalog.max_depth()))
}

async fn clean<S, P>(State(s): State<AppState<S, P>>, Json(body): Json<Value>) -> Json<Vec<Variant>>
where
    S: VariantRepository + OnHandInventory,
    P: EventPublisher,
{
    Json(validation::clean_variants_json(&body, s.catalog.max_depth()))
}

async fn issues(Json(body): Json<Value>) -> Json<ProductIssues> {
    Json(validation::has_product_issues(&body))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_quantity: u64,
    pub breakdown: Vec<BreakdownRow>,
    pub low_stock: Vec<BreakdownRow>,
}

async fn summary(Json(body): Json<Value>) -> Json<Summary> {
    let variants = validation::variants_from_json(&body);
    Json(Summary {
        total_quantity: aggregator::total_quantity(&variants),
        breakdown: aggregator::breakdown(&variants),
        low_stock: aggregator::low_stock(&variants),
    })
}

#[derive(Debug, Deserialize)]
pub struct EditRequest { #[serde(default)] pub variants: Value, pub command: EditCommand }

async fn edit<S, P>(State(s): State<AppState<S, P>>, Json(r): Json<EditRequest>) -> ApiResult<Json<Vec<Variant>>>
where
    S: VariantRepository + OnHandInventory,
    P: EventPublisher,
{
    let variants = validation::variants_from_json(&r.variants);
    let next = editor::apply(&variants, &r.command, s.catalog.max_depth()).map_err(VariantError::from)?;
    Ok(Json(next))
}

async fn get_variants<S, P>(State(s): State<AppState<S, P>>, Path(id): Path<Uuid>) -> ApiResult<Json<StockSnapshot>>
where
    S: VariantRepository + OnHandInventory,
    P: EventPublisher,
{
    Ok(Json(s.catalog.snapshot(id).await?))
}

async fn save_variants<S, P>(State(s): State<AppState<S, P>>, Path(id): Path<Uuid>, Json(body): Json<Value>) -> ApiResult<Json<StockSnapshot>>
where
    S: VariantRepository + OnHandInventory,
    P: EventPublisher,
{
    Ok(Json(s.catalog.save_variants(id, body).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawRequest {
    pub address: ValueAddress,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

async fn withdraw<S, P>(State(s): State<AppState<S, P>>, Path(id): Path<Uuid>, Json(r): Json<WithdrawRequest>) -> ApiResult<Json<StockSnapshot>>
where
    S: VariantRepository + OnHandInventory,
    P: EventPublisher,
{
    r.validate().map_err(|e| VariantError::BadRequest(e.to_string()))?;
    Ok(Json(s.catalog.withdraw(id, &r.address, r.quantity).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExportParams {
    #[validate(length(min = 1, max = 120))]
    pub title: Option<String>,
}

async fn export<S, P>(State(s): State<AppState<S, P>>, Path(id): Path<Uuid>, Query(p): Query<ExportParams>) -> ApiResult<Response>
where
    S: VariantRepository + OnHandInventory,
    P: EventPublisher,
{
    p.validate().map_err(|e| VariantError::BadRequest(e.to_string()))?;
    let table = s.catalog.export(id, p.title.as_deref()).await?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], table.render_csv()).into_response())
}
