//! App-wide settings document.
//!
//! DESIGN
//! ======
//! One JSONB row (`app_settings.id = 1`) holds every feature flag, image URL
//! and numeric tunable. The typed `AppSettings` struct is the schema: a patch
//! is merged into the current document and the result must deserialize and
//! validate before it is written. A `version` counter increments on every
//! write; callers that send `expected_version` get a conflict instead of
//! silently overwriting a concurrent edit.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Row};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid settings patch: {0}")]
    InvalidPatch(String),
    #[error("settings were modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict { expected: i64, actual: i64 },
    #[error("cannot delete the last banner line")]
    LastBannerLine,
    #[error("banner line {0} does not exist")]
    BannerLineNotFound(usize),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for SettingsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPatch(_) => "E_INVALID_SETTINGS",
            Self::VersionConflict { .. } => "E_VERSION_CONFLICT",
            Self::LastBannerLine => "E_LAST_BANNER_LINE",
            Self::BannerLineNotFound(_) => "E_NOT_FOUND",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

/// Every independent switch and tunable the apps read at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    pub app_name: String,
    pub maintenance_mode: bool,
    pub maintenance_message: String,
    pub min_app_version: String,
    pub latest_app_version: String,
    pub app_download_url: String,

    pub support_email: String,
    pub support_phone: String,
    pub whatsapp_link: String,
    pub telegram_link: String,
    pub youtube_link: String,

    pub logo_url: String,
    pub splash_image_url: String,
    pub home_banner_url: String,
    pub wallet_banner_url: String,
    pub refer_banner_url: String,

    pub deposits_enabled: bool,
    pub withdrawals_enabled: bool,
    pub referrals_enabled: bool,
    pub promo_codes_enabled: bool,
    pub in_app_ads_enabled: bool,
    pub show_leaderboard: bool,

    pub min_deposit: i64,
    pub max_deposit: i64,
    pub min_withdrawal: i64,
    pub max_withdrawal: i64,
    pub referral_reward_referrer: i64,
    pub referral_reward_referee: i64,
    pub leaderboard_size: i64,

    /// Scrolling announcement lines on the home screen. Never empty.
    pub banner_lines: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: "Arena".into(),
            maintenance_mode: false,
            maintenance_message: String::new(),
            min_app_version: "1.0.0".into(),
            latest_app_version: "1.0.0".into(),
            app_download_url: String::new(),
            support_email: String::new(),
            support_phone: String::new(),
            whatsapp_link: String::new(),
            telegram_link: String::new(),
            youtube_link: String::new(),
            logo_url: String::new(),
            splash_image_url: String::new(),
            home_banner_url: String::new(),
            wallet_banner_url: String::new(),
            refer_banner_url: String::new(),
            deposits_enabled: true,
            withdrawals_enabled: true,
            referrals_enabled: true,
            promo_codes_enabled: true,
            in_app_ads_enabled: false,
            show_leaderboard: true,
            min_deposit: 10,
            max_deposit: 50_000,
            min_withdrawal: 50,
            max_withdrawal: 10_000,
            referral_reward_referrer: 10,
            referral_reward_referee: 5,
            leaderboard_size: 50,
            banner_lines: vec!["Welcome to the arena!".into()],
        }
    }
}

impl AppSettings {
    /// Check cross-field constraints the type system can't express.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPatch` naming the first offending field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let non_negative = [
            ("min_deposit", self.min_deposit),
            ("max_deposit", self.max_deposit),
            ("min_withdrawal", self.min_withdrawal),
            ("max_withdrawal", self.max_withdrawal),
            ("referral_reward_referrer", self.referral_reward_referrer),
            ("referral_reward_referee", self.referral_reward_referee),
            ("leaderboard_size", self.leaderboard_size),
        ];
        if let Some((field, _)) = non_negative.iter().find(|(_, v)| *v < 0) {
            return Err(SettingsError::InvalidPatch(format!("{field} must not be negative")));
        }
        if self.min_deposit > self.max_deposit {
            return Err(SettingsError::InvalidPatch("min_deposit exceeds max_deposit".into()));
        }
        if self.min_withdrawal > self.max_withdrawal {
            return Err(SettingsError::InvalidPatch("min_withdrawal exceeds max_withdrawal".into()));
        }
        if self.banner_lines.is_empty() {
            return Err(SettingsError::LastBannerLine);
        }
        if self.banner_lines.iter().any(|l| l.trim().is_empty()) {
            return Err(SettingsError::InvalidPatch("banner lines must not be blank".into()));
        }
        Ok(())
    }

    /// Append a banner line.
    ///
    /// # Errors
    ///
    /// Rejects blank lines.
    pub fn add_banner_line(&mut self, line: &str) -> Result<(), SettingsError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(SettingsError::InvalidPatch("banner lines must not be blank".into()));
        }
        self.banner_lines.push(line.to_owned());
        Ok(())
    }

    /// Remove the banner line at `index`, refusing to empty the list.
    ///
    /// # Errors
    ///
    /// `BannerLineNotFound` for a bad index, `LastBannerLine` when only one remains.
    pub fn remove_banner_line(&mut self, index: usize) -> Result<String, SettingsError> {
        if index >= self.banner_lines.len() {
            return Err(SettingsError::BannerLineNotFound(index));
        }
        if self.banner_lines.len() == 1 {
            return Err(SettingsError::LastBannerLine);
        }
        Ok(self.banner_lines.remove(index))
    }
}

/// Settings plus the optimistic-concurrency counter.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsDoc {
    pub version: i64,
    pub settings: AppSettings,
}

/// Merge a JSON object patch into `current` and validate the result.
///
/// # Errors
///
/// Rejects non-object patches, unknown keys, wrong value types, and
/// anything `AppSettings::validate` refuses.
pub fn merge_patch(current: &AppSettings, patch: &serde_json::Value) -> Result<AppSettings, SettingsError> {
    let Some(patch) = patch.as_object() else {
        return Err(SettingsError::InvalidPatch("patch must be a JSON object".into()));
    };
    let mut doc = serde_json::to_value(current).map_err(|e| SettingsError::InvalidPatch(e.to_string()))?;
    let Some(fields) = doc.as_object_mut() else {
        return Err(SettingsError::InvalidPatch("settings must serialize to an object".into()));
    };
    for (key, value) in patch {
        fields.insert(key.clone(), value.clone());
    }
    let merged: AppSettings = serde_json::from_value(doc).map_err(|e| SettingsError::InvalidPatch(e.to_string()))?;
    merged.validate()?;
    Ok(merged)
}

// =============================================================================
// PERSISTENCE
// =============================================================================

fn parse_stored(data: serde_json::Value) -> AppSettings {
    match serde_json::from_value(data) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "stored settings unreadable; serving defaults");
            AppSettings::default()
        }
    }
}

/// Load settings on an existing connection (usually inside a transaction).
pub async fn load_in(conn: &mut PgConnection) -> Result<SettingsDoc, SettingsError> {
    let row = sqlx::query("SELECT data, version FROM app_settings WHERE id = 1")
        .fetch_optional(&mut *conn)
        .await?;
    Ok(match row {
        Some(row) => SettingsDoc { version: row.get("version"), settings: parse_stored(row.get("data")) },
        None => SettingsDoc { version: 0, settings: AppSettings::default() },
    })
}

/// Load the current settings, falling back to defaults when never saved.
pub async fn load(pool: &PgPool) -> Result<SettingsDoc, SettingsError> {
    let mut conn = pool.acquire().await?;
    load_in(&mut conn).await
}

async fn mutate<F>(pool: &PgPool, expected_version: Option<i64>, apply: F) -> Result<SettingsDoc, SettingsError>
where
    F: FnOnce(&AppSettings) -> Result<AppSettings, SettingsError>,
{
    let mut tx = pool.begin().await?;

    let defaults = serde_json::to_value(AppSettings::default()).map_err(|e| SettingsError::InvalidPatch(e.to_string()))?;
    sqlx::query("INSERT INTO app_settings (id, data, version) VALUES (1, $1, 0) ON CONFLICT (id) DO NOTHING")
        .bind(&defaults)
        .execute(&mut *tx)
        .await?;

    let row = sqlx::query("SELECT data, version FROM app_settings WHERE id = 1 FOR UPDATE")
        .fetch_one(&mut *tx)
        .await?;
    let actual: i64 = row.get("version");
    if let Some(expected) = expected_version {
        if expected != actual {
            return Err(SettingsError::VersionConflict { expected, actual });
        }
    }

    let current = parse_stored(row.get("data"));
    let next = apply(&current)?;
    let data = serde_json::to_value(&next).map_err(|e| SettingsError::InvalidPatch(e.to_string()))?;
    let version: i64 = sqlx::query_scalar(
        "UPDATE app_settings SET data = $1, version = version + 1, updated_at = now() WHERE id = 1 RETURNING version",
    )
    .bind(&data)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(version, "app settings updated");
    Ok(SettingsDoc { version, settings: next })
}

/// Apply a partial update to the settings document.
pub async fn update(pool: &PgPool, patch: &serde_json::Value, expected_version: Option<i64>) -> Result<SettingsDoc, SettingsError> {
    mutate(pool, expected_version, |current| merge_patch(current, patch)).await
}

pub async fn add_banner_line(pool: &PgPool, line: &str, expected_version: Option<i64>) -> Result<SettingsDoc, SettingsError> {
    mutate(pool, expected_version, |current| {
        let mut next = current.clone();
        next.add_banner_line(line)?;
        Ok(next)
    })
    .await
}

pub async fn remove_banner_line(pool: &PgPool, index: usize, expected_version: Option<i64>) -> Result<SettingsDoc, SettingsError> {
    mutate(pool, expected_version, |current| {
        let mut next = current.clone();
        next.remove_banner_line(index)?;
        Ok(next)
    })
    .await
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
