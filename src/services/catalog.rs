//! Catalog content shown in the apps: promotion banners, in-app ads and
//! the payment methods users deposit through.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

const MAX_AD_ID_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid {0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("an ad with id {0:?} already exists")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "E_INVALID_INPUT",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Conflict(_) => "E_DUPLICATE",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::Invalid(format!("{field}: must not be empty")));
    }
    Ok(())
}

// =============================================================================
// PROMOTIONS
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Promotion {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub link: Option<String>,
    pub active: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromotionInput {
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl PromotionInput {
    /// # Errors
    ///
    /// Title and image are required.
    pub fn validate(&self) -> Result<(), CatalogError> {
        require("title", &self.title)?;
        require("image_url", &self.image_url)
    }
}

const PROMOTION_COLUMNS: &str = "id, title, image_url, link, active, sort_order, created_at";

/// Promotions in display order. `active_only` is the user-facing view.
pub async fn list_promotions(pool: &PgPool, active_only: bool) -> Result<Vec<Promotion>, CatalogError> {
    let rows = sqlx::query_as::<_, Promotion>(&format!(
        "SELECT {PROMOTION_COLUMNS} FROM promotions
         WHERE active OR NOT $1
         ORDER BY sort_order ASC, created_at ASC"
    ))
    .bind(active_only)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_promotion(pool: &PgPool, input: &PromotionInput) -> Result<Promotion, CatalogError> {
    input.validate()?;
    let row = sqlx::query_as::<_, Promotion>(&format!(
        "INSERT INTO promotions (title, image_url, link, active, sort_order) VALUES ($1, $2, $3, $4, $5)
         RETURNING {PROMOTION_COLUMNS}"
    ))
    .bind(input.title.trim())
    .bind(input.image_url.trim())
    .bind(input.link.as_deref())
    .bind(input.active)
    .bind(input.sort_order)
    .fetch_one(pool)
    .await?;
    info!(promotion_id = %row.id, "promotion created");
    Ok(row)
}

pub async fn update_promotion(pool: &PgPool, id: Uuid, input: &PromotionInput) -> Result<Promotion, CatalogError> {
    input.validate()?;
    sqlx::query_as::<_, Promotion>(&format!(
        "UPDATE promotions SET title = $2, image_url = $3, link = $4, active = $5, sort_order = $6
         WHERE id = $1 RETURNING {PROMOTION_COLUMNS}"
    ))
    .bind(id)
    .bind(input.title.trim())
    .bind(input.image_url.trim())
    .bind(input.link.as_deref())
    .bind(input.active)
    .bind(input.sort_order)
    .fetch_optional(pool)
    .await?
    .ok_or(CatalogError::NotFound("promotion"))
}

pub async fn delete_promotion(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    let result = sqlx::query("DELETE FROM promotions WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::NotFound("promotion"));
    }
    Ok(())
}

// =============================================================================
// IN-APP ADS
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InAppAd {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub link: Option<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdInput {
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAd {
    pub id: String,
    #[serde(flatten)]
    pub ad: AdInput,
}

/// Ad ids are chosen by staff and used as slot keys by the apps:
/// lowercase letters, digits, `-` and `_`.
///
/// # Errors
///
/// Returns `Invalid` for empty, overlong or badly-formed ids.
pub fn normalize_ad_id(id: &str) -> Result<String, CatalogError> {
    let id = id.trim().to_ascii_lowercase();
    if id.is_empty() || id.len() > MAX_AD_ID_LEN {
        return Err(CatalogError::Invalid(format!("ad id: must be 1-{MAX_AD_ID_LEN} characters")));
    }
    if !id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_') {
        return Err(CatalogError::Invalid("ad id: only letters, digits, '-' and '_' are allowed".into()));
    }
    Ok(id)
}

const AD_COLUMNS: &str = "id, title, image_url, link, active, created_at";

pub async fn list_ads(pool: &PgPool, active_only: bool) -> Result<Vec<InAppAd>, CatalogError> {
    let rows = sqlx::query_as::<_, InAppAd>(&format!(
        "SELECT {AD_COLUMNS} FROM in_app_ads WHERE active OR NOT $1 ORDER BY created_at ASC"
    ))
    .bind(active_only)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_ad(pool: &PgPool, input: &NewAd) -> Result<InAppAd, CatalogError> {
    let id = normalize_ad_id(&input.id)?;
    require("title", &input.ad.title)?;
    require("image_url", &input.ad.image_url)?;

    let row = sqlx::query_as::<_, InAppAd>(&format!(
        "INSERT INTO in_app_ads (id, title, image_url, link, active) VALUES ($1, $2, $3, $4, $5) RETURNING {AD_COLUMNS}"
    ))
    .bind(&id)
    .bind(input.ad.title.trim())
    .bind(input.ad.image_url.trim())
    .bind(input.ad.link.as_deref())
    .bind(input.ad.active)
    .fetch_one(pool)
    .await
    .map_err(|e| if crate::db::is_unique_violation(&e) { CatalogError::Conflict(id.clone()) } else { CatalogError::Database(e) })?;

    info!(ad_id = %row.id, "in-app ad created");
    Ok(row)
}

pub async fn update_ad(pool: &PgPool, id: &str, input: &AdInput) -> Result<InAppAd, CatalogError> {
    let id = normalize_ad_id(id)?;
    require("title", &input.title)?;
    require("image_url", &input.image_url)?;
    sqlx::query_as::<_, InAppAd>(&format!(
        "UPDATE in_app_ads SET title = $2, image_url = $3, link = $4, active = $5 WHERE id = $1 RETURNING {AD_COLUMNS}"
    ))
    .bind(&id)
    .bind(input.title.trim())
    .bind(input.image_url.trim())
    .bind(input.link.as_deref())
    .bind(input.active)
    .fetch_optional(pool)
    .await?
    .ok_or(CatalogError::NotFound("ad"))
}

pub async fn delete_ad(pool: &PgPool, id: &str) -> Result<(), CatalogError> {
    let id = normalize_ad_id(id)?;
    let result = sqlx::query("DELETE FROM in_app_ads WHERE id = $1").bind(&id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::NotFound("ad"));
    }
    Ok(())
}

// =============================================================================
// PAYMENT METHODS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Upi,
    Bank,
    Wallet,
}

impl PaymentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upi => "upi",
            Self::Bank => "bank",
            Self::Wallet => "wallet",
        }
    }
}

impl TryFrom<String> for PaymentKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "upi" => Ok(Self::Upi),
            "bank" => Ok(Self::Bank),
            "wallet" => Ok(Self::Wallet),
            _ => Err(format!("unknown payment method kind {value:?}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: PaymentKind,
    pub details: String,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodInput {
    pub name: String,
    pub kind: PaymentKind,
    pub details: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

const PAYMENT_COLUMNS: &str = "id, name, kind, details, active, created_at";

pub async fn list_payment_methods(pool: &PgPool, active_only: bool) -> Result<Vec<PaymentMethod>, CatalogError> {
    let rows = sqlx::query_as::<_, PaymentMethod>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payment_methods WHERE active OR NOT $1 ORDER BY created_at ASC"
    ))
    .bind(active_only)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_payment_method(pool: &PgPool, input: &PaymentMethodInput) -> Result<PaymentMethod, CatalogError> {
    require("name", &input.name)?;
    require("details", &input.details)?;
    let row = sqlx::query_as::<_, PaymentMethod>(&format!(
        "INSERT INTO payment_methods (name, kind, details, active) VALUES ($1, $2, $3, $4) RETURNING {PAYMENT_COLUMNS}"
    ))
    .bind(input.name.trim())
    .bind(input.kind.as_str())
    .bind(input.details.trim())
    .bind(input.active)
    .fetch_one(pool)
    .await?;
    info!(payment_method_id = %row.id, kind = row.kind.as_str(), "payment method created");
    Ok(row)
}

pub async fn update_payment_method(pool: &PgPool, id: Uuid, input: &PaymentMethodInput) -> Result<PaymentMethod, CatalogError> {
    require("name", &input.name)?;
    require("details", &input.details)?;
    sqlx::query_as::<_, PaymentMethod>(&format!(
        "UPDATE payment_methods SET name = $2, kind = $3, details = $4, active = $5 WHERE id = $1 RETURNING {PAYMENT_COLUMNS}"
    ))
    .bind(id)
    .bind(input.name.trim())
    .bind(input.kind.as_str())
    .bind(input.details.trim())
    .bind(input.active)
    .fetch_optional(pool)
    .await?
    .ok_or(CatalogError::NotFound("payment method"))
}

pub async fn delete_payment_method(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    let result = sqlx::query("DELETE FROM payment_methods WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::NotFound("payment method"));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
