use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use shared::Actor;
use uuid::Uuid;

use super::form::FormFields;
use super::json::JsonBody;
use super::AppState;
use crate::error::AppResult;
use crate::handlers::accounts::{LoginOutcome, StoreLogin, StoreProfileForm, StoreRegistration};
use crate::handlers::catalog::{ProductForm, ServiceForm};
use crate::handlers::slots::SlotCreation;
use crate::models::{AppointmentView, Product, ReservationDetails, Service, ServiceSlot, Store};

#[derive(Debug, Deserialize)]
pub struct SlotRequest {
    pub timestamps: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SweepResult {
    pub canceled: Vec<Uuid>,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<StoreRegistration>,
) -> AppResult<(StatusCode, Json<Store>)> {
    let mut conn = state.pool.get().await?;
    let store = state.accounts.register_store(&mut conn, request).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<StoreLogin>,
) -> AppResult<Json<LoginOutcome>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.accounts.login_store(&mut conn, request).await?))
}

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Store>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.accounts.list_stores(&mut conn).await?))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Store>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.accounts.get_store(&mut conn, store_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<Store>> {
    let mut fields = FormFields::collect(multipart).await?;
    let form = StoreProfileForm {
        name: fields.take_text("name"),
        description: fields.take_text("description"),
        latitude: fields.take_text("latitude"),
        longitude: fields.take_text("longitude"),
        photo: fields.take_file("photo"),
    };
    let mut conn = state.pool.get().await?;
    Ok(Json(state.accounts.update_store_profile(&mut conn, store_id, form).await?))
}

pub async fn list_products(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<Product>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.catalog.list_products(&mut conn, store_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Product>)> {
    let mut fields = FormFields::collect(multipart).await?;
    let form = ProductForm {
        name: fields.take_text("name"),
        price: fields.take_text("price"),
        stock_quantity: fields.take_text("stock_quantity"),
        image: fields.take_file("image"),
    };
    let mut conn = state.pool.get().await?;
    let product = state.catalog.create_product(&mut conn, store_id, form).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let mut conn = state.pool.get().await?;
    state.catalog.delete_product(&mut conn, store_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reservations(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.reservations.list_for_store(&mut conn, store_id).await?))
}

pub async fn reservation(
    State(state): State<AppState>,
    Path((store_id, reservation_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ReservationDetails>> {
    let mut conn = state.pool.get().await?;
    let details = state
        .reservations
        .get(&mut conn, reservation_id, Actor::Store(store_id))
        .await?;
    Ok(Json(details))
}

pub async fn pickup(
    State(state): State<AppState>,
    Path((store_id, reservation_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ReservationDetails>> {
    let mut conn = state.pool.get().await?;
    let details = state
        .reservations
        .mark_picked_up(&mut conn, reservation_id, Actor::Store(store_id))
        .await?;
    Ok(Json(details))
}

pub async fn expire_reservations(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<SweepResult>> {
    let mut conn = state.pool.get().await?;
    let canceled = state.reservations.expire_sweep(&mut conn, store_id).await?;
    Ok(Json(SweepResult { canceled }))
}

pub async fn list_services(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<Service>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.catalog.list_services(&mut conn, store_id).await?))
}

pub async fn create_service(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    JsonBody(request): JsonBody<ServiceForm>,
) -> AppResult<(StatusCode, Json<Service>)> {
    let mut conn = state.pool.get().await?;
    let service = state.catalog.create_service(&mut conn, store_id, request).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Path((store_id, service_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let mut conn = state.pool.get().await?;
    state.catalog.delete_service(&mut conn, store_id, service_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_slots(
    State(state): State<AppState>,
    Path((store_id, service_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<ServiceSlot>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.slots.list_for_service(&mut conn, store_id, service_id).await?))
}

pub async fn create_slots(
    State(state): State<AppState>,
    Path((store_id, service_id)): Path<(Uuid, Uuid)>,
    JsonBody(request): JsonBody<SlotRequest>,
) -> AppResult<(StatusCode, Json<SlotCreation>)> {
    let mut conn = state.pool.get().await?;
    let created = state
        .slots
        .create_slots(&mut conn, store_id, service_id, &request.timestamps)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn agenda(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<AppointmentView>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.appointments.agenda_for_store(&mut conn, store_id).await?))
}

pub async fn accept_appointment(
    State(state): State<AppState>,
    Path((store_id, appointment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<AppointmentView>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.appointments.accept(&mut conn, store_id, appointment_id).await?))
}

pub async fn reject_appointment(
    State(state): State<AppState>,
    Path((store_id, appointment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<AppointmentView>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.appointments.reject(&mut conn, store_id, appointment_id).await?))
}
