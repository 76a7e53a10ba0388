use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use shared::slots::parse_slot_times;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Service, ServiceSlot};
use crate::schema::{service_slots, services};

#[derive(Debug, Clone, Serialize)]
pub struct SlotCreation {
    pub created: Vec<ServiceSlot>,
    pub skipped_existing: usize,
    pub rejected: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SlotManager;

impl SlotManager {
    /// Adds bookable times to a service.
    ///
    /// Times that already exist are skipped; unparseable entries are skipped
    /// too but reported back in `rejected`.
    pub async fn create_slots(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        service_id: Uuid,
        raw_times: &[String],
    ) -> AppResult<SlotCreation> {
        if raw_times.is_empty() {
            return Err(AppError::validation("at least one slot time is required"));
        }
        owned_service(conn, store_id, service_id).await?;

        let parsed = parse_slot_times(raw_times);
        if !parsed.rejected.is_empty() {
            warn!(%service_id, rejected = ?parsed.rejected, "skipping malformed slot times");
        }

        let rows: Vec<ServiceSlot> = parsed
            .times
            .iter()
            .map(|starts_at| ServiceSlot {
                id: Uuid::new_v4(),
                service_id,
                starts_at: *starts_at,
                is_available: true,
            })
            .collect();

        let created: Vec<ServiceSlot> = if rows.is_empty() {
            Vec::new()
        } else {
            diesel::insert_into(service_slots::table)
                .values(&rows)
                .on_conflict((service_slots::service_id, service_slots::starts_at))
                .do_nothing()
                .returning(ServiceSlot::as_returning())
                .get_results(conn)
                .await?
        };

        let skipped_existing = parsed.times.len() - created.len();
        info!(%service_id, created = created.len(), skipped_existing, "service slots added");

        Ok(SlotCreation {
            created,
            skipped_existing,
            rejected: parsed.rejected,
        })
    }

    pub async fn list_for_service(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        service_id: Uuid,
    ) -> AppResult<Vec<ServiceSlot>> {
        owned_service(conn, store_id, service_id).await?;
        let slots = service_slots::table
            .filter(service_slots::service_id.eq(service_id))
            .order(service_slots::starts_at.asc())
            .select(ServiceSlot::as_select())
            .load(conn)
            .await?;
        Ok(slots)
    }

    pub async fn list_available(
        &self,
        conn: &mut AsyncPgConnection,
        service_id: Uuid,
    ) -> AppResult<Vec<ServiceSlot>> {
        services::table
            .find(service_id)
            .select(services::id)
            .first::<Uuid>(conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("service", service_id))?;

        let slots = service_slots::table
            .filter(service_slots::service_id.eq(service_id))
            .filter(service_slots::is_available.eq(true))
            .order(service_slots::starts_at.asc())
            .select(ServiceSlot::as_select())
            .load(conn)
            .await?;
        Ok(slots)
    }

    /// Flips an available slot to booked. Returns `false` when someone else
    /// holds it; the row lock taken by the update serializes racing bookings.
    pub async fn lock(conn: &mut AsyncPgConnection, slot_id: Uuid) -> AppResult<bool> {
        let updated = diesel::update(
            service_slots::table
                .filter(service_slots::id.eq(slot_id))
                .filter(service_slots::is_available.eq(true)),
        )
        .set(service_slots::is_available.eq(false))
        .execute(conn)
        .await?;
        Ok(updated == 1)
    }

    pub async fn unlock(conn: &mut AsyncPgConnection, slot_id: Uuid) -> AppResult<bool> {
        let updated = diesel::update(service_slots::table.filter(service_slots::id.eq(slot_id)))
            .set(service_slots::is_available.eq(true))
            .execute(conn)
            .await?;
        Ok(updated == 1)
    }

    /// Fallback for appointments that lost their slot reference.
    pub async fn unlock_at(
        conn: &mut AsyncPgConnection,
        service_id: Uuid,
        starts_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let updated = diesel::update(
            service_slots::table
                .filter(service_slots::service_id.eq(service_id))
                .filter(service_slots::starts_at.eq(starts_at)),
        )
        .set(service_slots::is_available.eq(true))
        .execute(conn)
        .await?;
        if updated == 0 {
            debug!(%service_id, %starts_at, "no slot matches appointment time, nothing to release");
        }
        Ok(updated > 0)
    }
}

pub(crate) async fn owned_service(
    conn: &mut AsyncPgConnection,
    store_id: Uuid,
    service_id: Uuid,
) -> AppResult<Service> {
    services::table
        .filter(services::id.eq(service_id))
        .filter(services::store_id.eq(store_id))
        .select(Service::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("service", service_id))
}
