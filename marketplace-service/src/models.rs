use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use shared::windows::ReservationWindow;
use shared::{AppointmentStatus, ReservationStatus};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::clients)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub cpf: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::clients)]
pub struct NewClient {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub cpf: String,
    pub password_hash: String,
}

#[derive(Debug, Default, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::clients)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::stores)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub cnpj: String,
    pub cep: String,
    pub address: String,
    pub complement: Option<String>,
    pub lot: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub description: Option<String>,
    pub photo_path: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::stores)]
pub struct NewStore {
    pub id: Uuid,
    pub name: String,
    pub cnpj: String,
    pub cep: String,
    pub address: String,
    pub complement: Option<String>,
    pub lot: Option<String>,
    pub password_hash: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Default, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::stores)]
pub struct StoreChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::products)]
pub struct Product {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock_quantity: i32,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::products)]
pub struct NewProduct {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock_quantity: i32,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::services)]
pub struct Service {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::services)]
pub struct NewService {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::service_slots)]
pub struct ServiceSlot {
    pub id: Uuid,
    pub service_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub is_available: bool,
}

impl ServiceSlot {
    pub fn view(&self) -> shared::appointment::SlotView {
        shared::appointment::SlotView {
            service_id: self.service_id,
            starts_at: self.starts_at,
            is_available: self.is_available,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct CartItem {
    pub id: Uuid,
    pub client_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::product_reservations)]
pub struct ProductReservation {
    pub id: Uuid,
    pub client_id: Uuid,
    pub store_id: Uuid,
    pub status: String,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub pickup_deadline: DateTime<Utc>,
}

impl ProductReservation {
    pub fn status(&self) -> Result<ReservationStatus, AppError> {
        self.status
            .parse()
            .map_err(|e| AppError::Internal(format!("reservation {}: {}", self.id, e)))
    }

    pub fn window(&self) -> ReservationWindow {
        ReservationWindow {
            reserved_at: self.reserved_at,
            expires_at: self.expires_at,
            pickup_deadline: self.pickup_deadline,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::reservation_items)]
pub struct ReservationItem {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::service_appointments)]
pub struct ServiceAppointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub store_id: Uuid,
    pub service_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl ServiceAppointment {
    pub fn status(&self) -> Result<AppointmentStatus, AppError> {
        self.status
            .parse()
            .map_err(|e| AppError::Internal(format!("appointment {}: {}", self.id, e)))
    }
}

/// A reservation with its line items, as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    pub id: Uuid,
    pub client_id: Uuid,
    pub store_id: Uuid,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub pickup_deadline: DateTime<Utc>,
    pub items: Vec<ReservationItem>,
}

impl ReservationDetails {
    pub fn new(
        reservation: ProductReservation,
        items: Vec<ReservationItem>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            status: reservation.status()?,
            id: reservation.id,
            client_id: reservation.client_id,
            store_id: reservation.store_id,
            reserved_at: reservation.reserved_at,
            expires_at: reservation.expires_at,
            pickup_deadline: reservation.pickup_deadline,
            items,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub client_id: Uuid,
    pub store_id: Uuid,
    pub service_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub status: AppointmentStatus,
}

impl TryFrom<ServiceAppointment> for AppointmentView {
    type Error = AppError;

    fn try_from(appointment: ServiceAppointment) -> Result<Self, Self::Error> {
        Ok(Self {
            status: appointment.status()?,
            id: appointment.id,
            client_id: appointment.client_id,
            store_id: appointment.store_id,
            service_id: appointment.service_id,
            slot_id: appointment.slot_id,
            scheduled_for: appointment.scheduled_for,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}
