use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::appointment::{self, booking_day};
use shared::{AppointmentStatus, RuleViolation};
use tracing::info;
use uuid::Uuid;

use super::{SharedClock, SlotManager};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::schema::*;

pub struct AppointmentManager {
    clock: SharedClock,
}

impl AppointmentManager {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }

    /// Books `slot_id` for the client as a pending appointment.
    ///
    /// The client row is locked for the duration so two bookings by the same
    /// client cannot both pass the same-day check; the slot itself is taken
    /// with a conditional update, so of two racing clients only one wins.
    pub async fn book(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
        service_id: Uuid,
        slot_id: Uuid,
    ) -> AppResult<AppointmentView> {
        let now = self.clock.utc();

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                clients::table
                    .find(client_id)
                    .select(clients::id)
                    .for_update()
                    .first::<Uuid>(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("client", client_id))?;

                let service = services::table
                    .find(service_id)
                    .select(Service::as_select())
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("service", service_id))?;

                let slot = service_slots::table
                    .find(slot_id)
                    .select(ServiceSlot::as_select())
                    .first(conn)
                    .await
                    .optional()?;
                let slot_view = slot.as_ref().map(ServiceSlot::view);
                let starts_at = appointment::check_slot(slot_view.as_ref(), service.id)?;

                let day_start = booking_day(starts_at).and_hms_opt(0, 0, 0).map(|d| d.and_utc());
                let Some(day_start) = day_start else {
                    return Err(AppError::Internal(format!("cannot compute day for {starts_at}")));
                };
                let active = AppointmentStatus::active().map(|s| s.as_str());
                let same_day: Vec<(String, DateTime<Utc>)> = service_appointments::table
                    .filter(service_appointments::client_id.eq(client_id))
                    .filter(service_appointments::scheduled_for.ge(day_start))
                    .filter(service_appointments::scheduled_for.lt(day_start + Duration::days(1)))
                    .filter(service_appointments::status.eq_any(active))
                    .select((service_appointments::status, service_appointments::scheduled_for))
                    .load(conn)
                    .await?;
                let same_day = same_day
                    .into_iter()
                    .map(|(status, at)| {
                        status
                            .parse::<AppointmentStatus>()
                            .map(|status| (status, at))
                            .map_err(|e| AppError::Internal(e.to_string()))
                    })
                    .collect::<AppResult<Vec<_>>>()?;
                appointment::check_same_day(&same_day, starts_at)?;

                if !SlotManager::lock(conn, slot_id).await? {
                    return Err(RuleViolation::SlotUnavailable.into());
                }

                let booked = ServiceAppointment {
                    id: Uuid::new_v4(),
                    client_id,
                    store_id: service.store_id,
                    service_id: service.id,
                    slot_id: Some(slot_id),
                    scheduled_for: starts_at,
                    status: AppointmentStatus::Pending.as_str().to_string(),
                    created_at: now,
                };
                diesel::insert_into(service_appointments::table)
                    .values(&booked)
                    .execute(conn)
                    .await?;

                info!(appointment_id = %booked.id, %client_id, %slot_id, "appointment booked");
                AppointmentView::try_from(booked)
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn accept(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        appointment_id: Uuid,
    ) -> AppResult<AppointmentView> {
        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let current = for_store(conn, store_id, appointment_id).await?;
                let next = appointment::check_accept(current.status()?)?;
                let updated = set_status(conn, appointment_id, next).await?;
                info!(%appointment_id, %store_id, "appointment accepted");
                AppointmentView::try_from(updated)
            }
            .scope_boxed()
        })
        .await
    }

    /// Rejection frees the slot so the time can be booked again.
    pub async fn reject(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        appointment_id: Uuid,
    ) -> AppResult<AppointmentView> {
        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let current = for_store(conn, store_id, appointment_id).await?;
                let next = appointment::check_reject(current.status()?)?;
                let updated = set_status(conn, appointment_id, next).await?;
                release_slot(conn, &updated).await?;
                info!(%appointment_id, %store_id, "appointment rejected");
                AppointmentView::try_from(updated)
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn cancel(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
        appointment_id: Uuid,
    ) -> AppResult<AppointmentView> {
        let now = self.clock.utc();

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let current = service_appointments::table
                    .filter(service_appointments::id.eq(appointment_id))
                    .filter(service_appointments::client_id.eq(client_id))
                    .select(ServiceAppointment::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("appointment", appointment_id))?;

                let next =
                    appointment::check_cancel(current.status()?, current.scheduled_for, now)?;
                let updated = set_status(conn, appointment_id, next).await?;
                release_slot(conn, &updated).await?;
                info!(%appointment_id, %client_id, "appointment canceled");
                AppointmentView::try_from(updated)
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn agenda_for_store(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
    ) -> AppResult<Vec<AppointmentView>> {
        stores::table
            .find(store_id)
            .select(stores::id)
            .first::<Uuid>(conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("store", store_id))?;

        service_appointments::table
            .filter(service_appointments::store_id.eq(store_id))
            .order(service_appointments::scheduled_for.asc())
            .select(ServiceAppointment::as_select())
            .load(conn)
            .await?
            .into_iter()
            .map(AppointmentView::try_from)
            .collect()
    }

    pub async fn agenda_for_client(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
    ) -> AppResult<Vec<AppointmentView>> {
        clients::table
            .find(client_id)
            .select(clients::id)
            .first::<Uuid>(conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("client", client_id))?;

        service_appointments::table
            .filter(service_appointments::client_id.eq(client_id))
            .order(service_appointments::scheduled_for.asc())
            .select(ServiceAppointment::as_select())
            .load(conn)
            .await?
            .into_iter()
            .map(AppointmentView::try_from)
            .collect()
    }
}

async fn for_store(
    conn: &mut AsyncPgConnection,
    store_id: Uuid,
    appointment_id: Uuid,
) -> AppResult<ServiceAppointment> {
    service_appointments::table
        .filter(service_appointments::id.eq(appointment_id))
        .filter(service_appointments::store_id.eq(store_id))
        .select(ServiceAppointment::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("appointment", appointment_id))
}

async fn set_status(
    conn: &mut AsyncPgConnection,
    appointment_id: Uuid,
    status: AppointmentStatus,
) -> AppResult<ServiceAppointment> {
    let updated = diesel::update(service_appointments::table.find(appointment_id))
        .set(service_appointments::status.eq(status.as_str()))
        .returning(ServiceAppointment::as_returning())
        .get_result(conn)
        .await?;
    Ok(updated)
}

/// Makes the appointment's slot bookable again, by reference when we have
/// one and by service and time otherwise.
async fn release_slot(
    conn: &mut AsyncPgConnection,
    appointment: &ServiceAppointment,
) -> AppResult<()> {
    let released = match appointment.slot_id {
        Some(slot_id) => SlotManager::unlock(conn, slot_id).await?,
        None => false,
    };
    if !released {
        SlotManager::unlock_at(conn, appointment.service_id, appointment.scheduled_for).await?;
    }
    Ok(())
}
