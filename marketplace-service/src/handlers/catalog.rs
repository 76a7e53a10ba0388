use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use num_traits::Zero;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::require_text;
use crate::blob::{BlobStore, Upload};
use crate::error::{AppError, AppResult};
use crate::models::{NewProduct, NewService, Product, Service};
use crate::schema::{products, services, stores};

/// Raw product form fields as they arrive from a multipart upload.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub price: Option<String>,
    pub stock_quantity: Option<String>,
    pub image: Option<Upload>,
}

#[derive(Debug)]
struct ValidProduct {
    name: String,
    price: BigDecimal,
    stock_quantity: i32,
    image: Upload,
}

impl ProductForm {
    fn validate(self) -> AppResult<ValidProduct> {
        let name = require_text(self.name, "name")?;
        let price = parse_price(require_text(self.price, "price")?.as_str())?;
        let stock_quantity = require_text(self.stock_quantity, "stock_quantity")?
            .parse::<i32>()
            .map_err(|_| AppError::validation("stock_quantity must be a whole number"))?;
        if stock_quantity < 0 {
            return Err(AppError::validation("stock_quantity cannot be negative"));
        }
        let image = self
            .image
            .ok_or_else(|| AppError::validation("image is required"))?;
        Ok(ValidProduct {
            name,
            price,
            stock_quantity,
            image,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceForm {
    pub name: Option<String>,
    pub price: Option<BigDecimal>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub store_id: Option<Uuid>,
    pub name: Option<String>,
}

fn parse_price(raw: &str) -> AppResult<BigDecimal> {
    let price = BigDecimal::from_str(raw)
        .map_err(|_| AppError::validation("price must be a number"))?;
    ensure_price(&price)?;
    Ok(price)
}

fn ensure_price(price: &BigDecimal) -> AppResult<()> {
    if *price < BigDecimal::zero() {
        return Err(AppError::validation("price cannot be negative"));
    }
    Ok(())
}

fn name_pattern(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

pub struct CatalogManager {
    blobs: Arc<dyn BlobStore>,
}

impl CatalogManager {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub async fn create_product(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        form: ProductForm,
    ) -> AppResult<Product> {
        let valid = form.validate()?;
        ensure_store(conn, store_id).await?;

        let image_path = self.blobs.store(&valid.image, &format!("product_{store_id}")).await?;
        let new_product = NewProduct {
            id: Uuid::new_v4(),
            store_id,
            name: valid.name,
            price: valid.price,
            stock_quantity: valid.stock_quantity,
            image_path: Some(image_path.clone()),
        };

        let inserted = diesel::insert_into(products::table)
            .values(&new_product)
            .returning(Product::as_returning())
            .get_result(conn)
            .await;
        match inserted {
            Ok(product) => {
                info!(product_id = %product.id, %store_id, "product created");
                Ok(product)
            }
            Err(e) => {
                self.blobs.remove(&image_path).await;
                Err(e.into())
            }
        }
    }

    pub async fn list_products(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
    ) -> AppResult<Vec<Product>> {
        ensure_store(conn, store_id).await?;
        let rows = products::table
            .filter(products::store_id.eq(store_id))
            .order(products::name.asc())
            .select(Product::as_select())
            .load(conn)
            .await?;
        Ok(rows)
    }

    /// Products still referenced by a reservation cannot be deleted; that
    /// surfaces as a constraint violation.
    pub async fn delete_product(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<()> {
        let image_path: Option<String> = diesel::delete(
            products::table
                .filter(products::id.eq(product_id))
                .filter(products::store_id.eq(store_id)),
        )
        .returning(products::image_path)
        .get_result::<Option<String>>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("product", product_id))?;

        if let Some(path) = image_path {
            self.blobs.remove(&path).await;
        }
        info!(%product_id, %store_id, "product deleted");
        Ok(())
    }

    pub async fn search_products(
        &self,
        conn: &mut AsyncPgConnection,
        query: &CatalogQuery,
    ) -> AppResult<Vec<Product>> {
        let mut statement = products::table.select(Product::as_select()).into_boxed();
        if let Some(store_id) = query.store_id {
            statement = statement.filter(products::store_id.eq(store_id));
        }
        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            statement = statement.filter(products::name.ilike(name_pattern(name)));
        }
        let rows = statement.order(products::name.asc()).load(conn).await?;
        Ok(rows)
    }

    pub async fn create_service(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        form: ServiceForm,
    ) -> AppResult<Service> {
        let name = require_text(form.name, "name")?;
        let price = form.price.ok_or_else(|| AppError::validation("price is required"))?;
        ensure_price(&price)?;
        ensure_store(conn, store_id).await?;

        let new_service = NewService {
            id: Uuid::new_v4(),
            store_id,
            name,
            description: form.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            price,
        };
        let service = diesel::insert_into(services::table)
            .values(&new_service)
            .returning(Service::as_returning())
            .get_result(conn)
            .await?;

        info!(service_id = %service.id, %store_id, "service created");
        Ok(service)
    }

    pub async fn list_services(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
    ) -> AppResult<Vec<Service>> {
        ensure_store(conn, store_id).await?;
        let rows = services::table
            .filter(services::store_id.eq(store_id))
            .order(services::name.asc())
            .select(Service::as_select())
            .load(conn)
            .await?;
        Ok(rows)
    }

    /// Slots go with the service. Services with appointment history are kept.
    pub async fn delete_service(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
        service_id: Uuid,
    ) -> AppResult<()> {
        let deleted = diesel::delete(
            services::table
                .filter(services::id.eq(service_id))
                .filter(services::store_id.eq(store_id)),
        )
        .execute(conn)
        .await?;
        if deleted == 0 {
            return Err(AppError::not_found("service", service_id));
        }
        info!(%service_id, %store_id, "service deleted");
        Ok(())
    }

    pub async fn search_services(
        &self,
        conn: &mut AsyncPgConnection,
        query: &CatalogQuery,
    ) -> AppResult<Vec<Service>> {
        let mut statement = services::table.select(Service::as_select()).into_boxed();
        if let Some(store_id) = query.store_id {
            statement = statement.filter(services::store_id.eq(store_id));
        }
        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            statement = statement.filter(services::name.ilike(name_pattern(name)));
        }
        let rows = statement.order(services::name.asc()).load(conn).await?;
        Ok(rows)
    }
}

pub(crate) async fn ensure_store(conn: &mut AsyncPgConnection, store_id: Uuid) -> AppResult<()> {
    let found = stores::table
        .find(store_id)
        .select(stores::id)
        .first::<Uuid>(conn)
        .await
        .optional()?;
    if found.is_none() {
        warn!(%store_id, "catalog request for unknown store");
        return Err(AppError::not_found("store", store_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared::MarketplaceError;

    fn png() -> Upload {
        Upload {
            file_name: "soap.png".into(),
            content_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        }
    }

    fn form(price: &str, stock: &str, image: Option<Upload>) -> ProductForm {
        ProductForm {
            name: Some(" Soap ".into()),
            price: Some(price.into()),
            stock_quantity: Some(stock.into()),
            image,
        }
    }

    #[test]
    fn valid_product_form() {
        let valid = form("12.50", "5", Some(png())).validate().unwrap();
        assert_eq!(valid.name, "Soap");
        assert_eq!(valid.price, BigDecimal::from_str("12.50").unwrap());
        assert_eq!(valid.stock_quantity, 5);
        assert_eq!(valid.image.content_type, "image/png");
    }

    #[test]
    fn product_form_rejects_bad_numbers() {
        assert_matches!(
            form("-1", "5", Some(png())).validate(),
            Err(AppError::Domain(MarketplaceError::Validation(msg))) if msg.contains("price")
        );
        assert_matches!(
            form("abc", "5", Some(png())).validate(),
            Err(AppError::Domain(MarketplaceError::Validation(_)))
        );
        assert_matches!(
            form("1", "-2", Some(png())).validate(),
            Err(AppError::Domain(MarketplaceError::Validation(msg))) if msg.contains("negative")
        );
        assert_matches!(
            form("1", "2.5", Some(png())).validate(),
            Err(AppError::Domain(MarketplaceError::Validation(_)))
        );
    }

    #[test]
    fn product_form_requires_image() {
        assert_matches!(
            form("1", "1", None).validate(),
            Err(AppError::Domain(MarketplaceError::Validation(msg))) if msg == "image is required"
        );
    }

    #[test]
    fn zero_price_and_stock_are_allowed() {
        let valid = form("0", "0", Some(png())).validate().unwrap();
        assert!(valid.price.is_zero());
        assert_eq!(valid.stock_quantity, 0);
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        assert_eq!(name_pattern("soap"), "%soap%");
        assert_eq!(name_pattern("50%_off"), "%50\\%\\_off%");
    }
}
