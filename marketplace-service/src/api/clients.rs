use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use shared::Actor;
use uuid::Uuid;

use super::form::FormFields;
use super::json::JsonBody;
use super::AppState;
use crate::error::AppResult;
use crate::handlers::accounts::{ClientLogin, ClientProfileForm, ClientRegistration, LoginOutcome};
use crate::handlers::reservations::CheckoutReceipt;
use crate::models::{AppointmentView, CartItem, CartLineView, Client, ReservationDetails};

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartQuery {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub slot_id: Uuid,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ClientRegistration>,
) -> AppResult<(StatusCode, Json<Client>)> {
    let mut conn = state.pool.get().await?;
    let client = state.accounts.register_client(&mut conn, request).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ClientLogin>,
) -> AppResult<Json<LoginOutcome>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.accounts.login_client(&mut conn, request).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<Client>> {
    let mut fields = FormFields::collect(multipart).await?;
    let form = ClientProfileForm {
        name: fields.take_text("name"),
        age: fields.take_text("age"),
        photo: fields.take_file("photo"),
    };
    let mut conn = state.pool.get().await?;
    Ok(Json(state.accounts.update_client_profile(&mut conn, client_id, form).await?))
}

pub async fn view_cart(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Vec<CartLineView>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.cart.view(&mut conn, client_id).await?))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    JsonBody(request): JsonBody<AddToCartRequest>,
) -> AppResult<Json<CartItem>> {
    let mut conn = state.pool.get().await?;
    let line = state
        .cart
        .add_item(&mut conn, client_id, request.product_id, request.quantity.unwrap_or(1))
        .await?;
    Ok(Json(line))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    Query(query): Query<RemoveFromCartQuery>,
) -> AppResult<StatusCode> {
    let mut conn = state.pool.get().await?;
    state.cart.remove_item(&mut conn, client_id, query.product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn checkout(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<CheckoutReceipt>)> {
    let mut conn = state.pool.get().await?;
    let receipt = state.reservations.checkout(&mut conn, client_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn reservations(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.reservations.list_for_client(&mut conn, client_id).await?))
}

pub async fn reservation(
    State(state): State<AppState>,
    Path((client_id, reservation_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ReservationDetails>> {
    let mut conn = state.pool.get().await?;
    let details = state
        .reservations
        .get(&mut conn, reservation_id, Actor::Client(client_id))
        .await?;
    Ok(Json(details))
}

pub async fn pickup(
    State(state): State<AppState>,
    Path((client_id, reservation_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ReservationDetails>> {
    let mut conn = state.pool.get().await?;
    let details = state
        .reservations
        .mark_picked_up(&mut conn, reservation_id, Actor::Client(client_id))
        .await?;
    Ok(Json(details))
}

pub async fn book(
    State(state): State<AppState>,
    Path((client_id, service_id)): Path<(Uuid, Uuid)>,
    JsonBody(request): JsonBody<BookingRequest>,
) -> AppResult<(StatusCode, Json<AppointmentView>)> {
    let mut conn = state.pool.get().await?;
    let appointment = state
        .appointments
        .book(&mut conn, client_id, service_id, request.slot_id)
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path((client_id, appointment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<AppointmentView>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.appointments.cancel(&mut conn, client_id, appointment_id).await?))
}

pub async fn agenda(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Vec<AppointmentView>>> {
    let mut conn = state.pool.get().await?;
    Ok(Json(state.appointments.agenda_for_client(&mut conn, client_id).await?))
}
