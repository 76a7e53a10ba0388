//! Public catalog lookups that are not scoped to a signed-in account.

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use super::AppState;
use crate::error::AppResult;
use crate::handlers::catalog::CatalogQuery;
use crate::models::{Product, Service, ServiceSlot};

pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.catalog.search_products(&mut conn, &query).await?))
}

pub async fn search_services(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<Vec<Service>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.catalog.search_services(&mut conn, &query).await?))
}

pub async fn available_slots(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> AppResult<Json<Vec<ServiceSlot>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.slots.list_available(&mut conn, service_id).await?))
}
