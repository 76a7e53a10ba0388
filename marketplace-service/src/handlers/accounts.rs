use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::require_text;
use crate::blob::{BlobStore, Upload};
use crate::credentials::CredentialService;
use crate::error::{AppError, AppResult};
use crate::models::{Client, ClientChanges, NewClient, NewStore, Store, StoreChanges};
use crate::schema::{clients, stores};
use shared::MarketplaceError;

#[derive(Debug, Default, Deserialize)]
pub struct ClientRegistration {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub cpf: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientLogin {
    pub cpf: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default)]
pub struct ClientProfileForm {
    pub name: Option<String>,
    pub age: Option<String>,
    pub photo: Option<Upload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreRegistration {
    pub name: Option<String>,
    pub cnpj: Option<String>,
    pub cep: Option<String>,
    pub address: Option<String>,
    pub complement: Option<String>,
    pub lot: Option<String>,
    pub password: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreLogin {
    pub cnpj: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default)]
pub struct StoreProfileForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub photo: Option<Upload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub id: Uuid,
    pub name: String,
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn optional_number<T: std::str::FromStr>(
    value: Option<String>,
    field: &str,
) -> AppResult<Option<T>> {
    optional_text(value)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| AppError::validation(format!("{field} must be a number")))
        })
        .transpose()
}

fn parse_age(value: Option<String>) -> AppResult<Option<i32>> {
    let age = optional_number::<i32>(value, "age")?;
    if matches!(age, Some(a) if a < 0) {
        return Err(AppError::validation("age cannot be negative"));
    }
    Ok(age)
}

fn duplicate(err: DieselError, message: &str) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            AppError::validation(message)
        }
        other => other.into(),
    }
}

impl ClientProfileForm {
    fn has_fields(&self) -> bool {
        self.name.is_some() || self.age.is_some() || self.photo.is_some()
    }
}

impl StoreProfileForm {
    fn has_fields(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.latitude.is_some()
            || self.longitude.is_some()
            || self.photo.is_some()
    }
}

pub struct AccountManager {
    credentials: Arc<dyn CredentialService>,
    blobs: Arc<dyn BlobStore>,
}

impl AccountManager {
    pub fn new(credentials: Arc<dyn CredentialService>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { credentials, blobs }
    }

    pub async fn register_client(
        &self,
        conn: &mut AsyncPgConnection,
        form: ClientRegistration,
    ) -> AppResult<Client> {
        let name = require_text(form.name, "name")?;
        let cpf = require_text(form.cpf, "cpf")?;
        let password = require_text(form.password, "password")?;
        let age = form.age.ok_or_else(|| AppError::validation("age is required"))?;
        if age < 0 {
            return Err(AppError::validation("age cannot be negative"));
        }

        let new_client = NewClient {
            id: Uuid::new_v4(),
            name,
            age,
            cpf,
            password_hash: self.credentials.hash(&password)?,
        };
        let client = diesel::insert_into(clients::table)
            .values(&new_client)
            .returning(Client::as_returning())
            .get_result(conn)
            .await
            .map_err(|e| duplicate(e, "cpf already registered"))?;

        info!(client_id = %client.id, "client registered");
        Ok(client)
    }

    /// Unknown cpf and wrong password are indistinguishable to the caller.
    pub async fn login_client(
        &self,
        conn: &mut AsyncPgConnection,
        form: ClientLogin,
    ) -> AppResult<LoginOutcome> {
        let cpf = require_text(form.cpf, "cpf")?;
        let password = require_text(form.password, "password")?;

        let client = clients::table
            .filter(clients::cpf.eq(&cpf))
            .select(Client::as_select())
            .first(conn)
            .await
            .optional()?;
        match client {
            Some(client) if self.credentials.verify(&password, &client.password_hash)? => {
                Ok(LoginOutcome {
                    id: client.id,
                    name: client.name,
                })
            }
            _ => {
                warn!("client login rejected");
                Err(MarketplaceError::InvalidCredentials.into())
            }
        }
    }

    pub async fn update_client_profile(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
        form: ClientProfileForm,
    ) -> AppResult<Client> {
        let current = clients::table
            .find(client_id)
            .select(Client::as_select())
            .first(conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("client", client_id))?;
        if !form.has_fields() {
            return Ok(current);
        }

        let mut changes = ClientChanges {
            name: optional_text(form.name),
            age: parse_age(form.age)?,
            photo_path: None,
        };
        if let Some(photo) = &form.photo {
            let stored = self.blobs.store(photo, &format!("client_{client_id}")).await?;
            changes.photo_path = Some(stored);
        }
        if changes.name.is_none() && changes.age.is_none() && changes.photo_path.is_none() {
            return Ok(current);
        }

        let updated = diesel::update(clients::table.find(client_id))
            .set(&changes)
            .returning(Client::as_returning())
            .get_result(conn)
            .await;
        let updated = match updated {
            Ok(client) => client,
            Err(e) => {
                if let Some(path) = &changes.photo_path {
                    self.blobs.remove(path).await;
                }
                return Err(e.into());
            }
        };

        if changes.photo_path.is_some() {
            if let Some(old) = &current.photo_path {
                self.blobs.remove(old).await;
            }
        }
        info!(%client_id, "client profile updated");
        Ok(updated)
    }

    pub async fn register_store(
        &self,
        conn: &mut AsyncPgConnection,
        form: StoreRegistration,
    ) -> AppResult<Store> {
        let new_store = NewStore {
            id: Uuid::new_v4(),
            name: require_text(form.name, "name")?,
            cnpj: require_text(form.cnpj, "cnpj")?,
            cep: require_text(form.cep, "cep")?,
            address: require_text(form.address, "address")?,
            complement: optional_text(form.complement),
            lot: optional_text(form.lot),
            password_hash: self.credentials.hash(&require_text(form.password, "password")?)?,
            latitude: form.latitude,
            longitude: form.longitude,
        };
        let store = diesel::insert_into(stores::table)
            .values(&new_store)
            .returning(Store::as_returning())
            .get_result(conn)
            .await
            .map_err(|e| duplicate(e, "cnpj already registered"))?;

        info!(store_id = %store.id, "store registered");
        Ok(store)
    }

    pub async fn login_store(
        &self,
        conn: &mut AsyncPgConnection,
        form: StoreLogin,
    ) -> AppResult<LoginOutcome> {
        let cnpj = require_text(form.cnpj, "cnpj")?;
        let password = require_text(form.password, "password")?;

        let store = stores::table
            .filter(stores::cnpj.eq(&cnpj))
            .select(Store::as_select())
            .first(conn)
            .await
            .optional()?;
        match store {
            Some(store) if self.credentials.verify(&password, &store.password_hash)? => {
                Ok(LoginOutcome {
                    id: store.id,
                    name: store.name,
                })
            }
            _ => {
                warn!("store login rejected");
                Err(MarketplaceError::InvalidCredentials.into())
            }
        }
    }

    pub async fn get_store(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
    ) -> AppResult<Store> {
        stores::table
            .find(store_id)
            .select(Store::as_select())
            .first(conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("store", store_id))
    }

    pub async fn list_stores(&self, conn: &mut AsyncPgConnection) -> AppResult<Vec<Store>> {
        let rows = stores::table
            .order(stores::name.asc())
            .select(Store::as_select())
            .load(conn)
            .await?;
        Ok(rows)
    }

    pub async fn update_store_profile(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        form: StoreProfileForm,
    ) -> AppResult<Store> {
        let current = self.get_store(conn, store_id).await?;
        if !form.has_fields() {
            return Ok(current);
        }

        let mut changes = StoreChanges {
            name: optional_text(form.name),
            description: optional_text(form.description),
            latitude: optional_number(form.latitude, "latitude")?,
            longitude: optional_number(form.longitude, "longitude")?,
            photo_path: None,
        };
        if let Some(photo) = &form.photo {
            changes.photo_path = Some(self.blobs.store(photo, &format!("store_{store_id}")).await?);
        }
        if changes.name.is_none()
            && changes.description.is_none()
            && changes.latitude.is_none()
            && changes.longitude.is_none()
            && changes.photo_path.is_none()
        {
            return Ok(current);
        }

        let updated = diesel::update(stores::table.find(store_id))
            .set(&changes)
            .returning(Store::as_returning())
            .get_result(conn)
            .await;
        let updated = match updated {
            Ok(store) => store,
            Err(e) => {
                if let Some(path) = &changes.photo_path {
                    self.blobs.remove(path).await;
                }
                return Err(e.into());
            }
        };

        if changes.photo_path.is_some() {
            if let Some(old) = &current.photo_path {
                self.blobs.remove(old).await;
            }
        }
        info!(%store_id, "store profile updated");
        Ok(updated)
    }
}
