//! Settings documents: shipping zones, taxes, payments, notifications and
//! the store profile.
//!
//! Each collection is read and written whole. Missing documents are seeded
//! with defaults on first read so a fresh database has a usable checkout.
//! Edits to a collection go through [`SettingsService::update`], which only
//! writes if the document is unchanged since it was read and retries
//! otherwise.

use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use thriftstore_core::{PaymentMethod, ShippingZoneId, TaxCategoryId, round_money};

use super::non_blank;
use crate::db::{RepositoryError, SettingsStore};
use crate::error::{AppError, FieldErrors};
use crate::models::{
    NotificationSettings, PaymentMethodConfig, PaymentMethodUpdate, ShippingZone,
    ShippingZoneForm, StoreSettings, TaxCategory, TaxCategoryForm,
};

/// Attempts at a read-modify-write before giving up under contention.
const MAX_UPDATE_ATTEMPTS: usize = 16;

pub struct SettingsService<'a> {
    settings: &'a dyn SettingsStore,
}

impl<'a> SettingsService<'a> {
    #[must_use]
    pub const fn new(settings: &'a dyn SettingsStore) -> Self {
        Self { settings }
    }

    async fn load<T>(&self, key: &str, default: impl FnOnce() -> T) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(value) = self.settings.get(key).await? {
            return decode(key, value);
        }
        let value = default();
        if self.settings.replace(key, None, encode(key, &value)?).await? {
            tracing::info!(key, "Seeded default settings");
            return Ok(value);
        }
        // Seeded by a concurrent request.
        match self.settings.get(key).await? {
            Some(stored) => decode(key, stored),
            None => Ok(value),
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        self.settings.set(key, encode(key, value)?).await?;
        Ok(())
    }

    /// Read the document at `key`, apply `edit` and write it back, retrying
    /// from a fresh read if another writer changed it in between.
    async fn update<T, R>(
        &self,
        key: &str,
        default: impl Fn() -> T + Send,
        mut edit: impl FnMut(&mut T) -> Result<R, AppError> + Send,
    ) -> Result<R, AppError>
    where
        T: Serialize + DeserializeOwned + Send,
        R: Send,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let stored = self.settings.get(key).await?;
            let mut value = match &stored {
                Some(json) => decode(key, json.clone())?,
                None => default(),
            };
            let result = edit(&mut value)?;
            if self
                .settings
                .replace(key, stored.as_ref(), encode(key, &value)?)
                .await?
            {
                return Ok(result);
            }
            tracing::debug!(key, attempt, "Settings changed concurrently, retrying");
        }
        tracing::warn!(key, "Gave up updating settings under contention");
        Err(AppError::Conflict(format!(
            "settings '{key}' are being changed elsewhere, try again"
        )))
    }

    // =========================================================================
    // Shipping zones
    // =========================================================================

    pub async fn shipping_zones(&self, search: Option<&str>) -> Result<Vec<ShippingZone>, AppError> {
        let zones = self.load(ShippingZone::KEY, default_zones).await?;
        let Some(q) = non_blank(search).map(|q| q.to_lowercase()) else {
            return Ok(zones);
        };
        Ok(zones
            .into_iter()
            .filter(|z| {
                z.name.to_lowercase().contains(&q)
                    || z.regions.iter().any(|r| r.to_lowercase().contains(&q))
            })
            .collect())
    }

    /// The active zone serving `region`, matched case-insensitively.
    pub async fn resolve_zone(&self, region: &str) -> Result<Option<ShippingZone>, AppError> {
        let zones = self.load(ShippingZone::KEY, default_zones).await?;
        Ok(zones.into_iter().find(|z| z.active && z.serves(region)))
    }

    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_zone(&self, form: ShippingZoneForm) -> Result<ShippingZone, AppError> {
        self.update(ShippingZone::KEY, default_zones, |zones| {
            let next = zones.iter().map(|z| z.id.as_i32()).max().unwrap_or(0) + 1;
            let zone = zone_from_form(ShippingZoneId::new(next), form.clone(), zones)?;
            zones.push(zone.clone());
            Ok(zone)
        })
        .await
    }

    #[instrument(skip(self, form))]
    pub async fn update_zone(
        &self,
        id: ShippingZoneId,
        form: ShippingZoneForm,
    ) -> Result<ShippingZone, AppError> {
        self.update(ShippingZone::KEY, default_zones, |zones| {
            if !zones.iter().any(|z| z.id == id) {
                return Err(AppError::NotFound(format!("shipping zone {id}")));
            }
            let others: Vec<ShippingZone> =
                zones.iter().filter(|z| z.id != id).cloned().collect();
            let zone = zone_from_form(id, form.clone(), &others)?;
            for existing in zones.iter_mut().filter(|z| z.id == id) {
                *existing = zone.clone();
            }
            Ok(zone)
        })
        .await
    }

    pub async fn delete_zone(&self, id: ShippingZoneId) -> Result<(), AppError> {
        self.update(ShippingZone::KEY, default_zones, |zones| {
            let before = zones.len();
            zones.retain(|z| z.id != id);
            if zones.len() == before {
                return Err(AppError::NotFound(format!("shipping zone {id}")));
            }
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Tax categories
    // =========================================================================

    pub async fn tax_categories(&self, search: Option<&str>) -> Result<Vec<TaxCategory>, AppError> {
        let taxes = self.load(TaxCategory::KEY, default_taxes).await?;
        let Some(q) = non_blank(search).map(|q| q.to_lowercase()) else {
            return Ok(taxes);
        };
        Ok(taxes
            .into_iter()
            .filter(|t| t.name.to_lowercase().contains(&q))
            .collect())
    }

    /// The tax applied at checkout, if any category is marked default.
    pub async fn default_tax(&self) -> Result<Option<TaxCategory>, AppError> {
        let taxes = self.load(TaxCategory::KEY, default_taxes).await?;
        Ok(taxes.into_iter().find(|t| t.is_default))
    }

    /// Add a tax category. The first category becomes the default.
    pub async fn create_tax(&self, form: TaxCategoryForm) -> Result<TaxCategory, AppError> {
        self.update(TaxCategory::KEY, default_taxes, |taxes| {
            let next = taxes.iter().map(|t| t.id.as_i32()).max().unwrap_or(0) + 1;
            let mut tax = tax_from_form(TaxCategoryId::new(next), form.clone())?;
            tax.is_default |= taxes.is_empty();
            if tax.is_default {
                taxes.iter_mut().for_each(|t| t.is_default = false);
            }
            taxes.push(tax.clone());
            Ok(tax)
        })
        .await
    }

    /// Edit a tax category. The default can only move by marking another
    /// category default; unmarking it directly is rejected.
    pub async fn update_tax(
        &self,
        id: TaxCategoryId,
        form: TaxCategoryForm,
    ) -> Result<TaxCategory, AppError> {
        let tax = tax_from_form(id, form)?;
        self.update(TaxCategory::KEY, default_taxes, |taxes| {
            let current = taxes
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| AppError::NotFound(format!("tax category {id}")))?;
            if current.is_default && !tax.is_default {
                return Err(AppError::field(
                    "is_default",
                    "mark another tax category as default instead",
                ));
            }
            for existing in &mut *taxes {
                if existing.id == id {
                    *existing = tax.clone();
                } else if tax.is_default {
                    existing.is_default = false;
                }
            }
            Ok(tax.clone())
        })
        .await
    }

    /// Remove a tax category. Removing the default leaves checkout untaxed.
    pub async fn delete_tax(&self, id: TaxCategoryId) -> Result<(), AppError> {
        self.update(TaxCategory::KEY, default_taxes, |taxes| {
            let before = taxes.len();
            taxes.retain(|t| t.id != id);
            if taxes.len() == before {
                return Err(AppError::NotFound(format!("tax category {id}")));
            }
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Payment methods
    // =========================================================================

    /// Payment methods with credentials masked.
    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethodConfig>, AppError> {
        let methods = self
            .load(PaymentMethodConfig::KEY, PaymentMethodConfig::defaults)
            .await?;
        Ok(methods.iter().map(PaymentMethodConfig::redacted).collect())
    }

    pub async fn is_payment_enabled(&self, method: PaymentMethod) -> Result<bool, AppError> {
        let methods: Vec<PaymentMethodConfig> = self
            .load(PaymentMethodConfig::KEY, PaymentMethodConfig::defaults)
            .await?;
        Ok(methods.iter().any(|m| m.method == method && m.enabled))
    }

    /// Apply an update. Masked or blank credential values keep the stored
    /// secret.
    #[instrument(skip(self, update))]
    pub async fn update_payment_method(
        &self,
        method: PaymentMethod,
        update: PaymentMethodUpdate,
    ) -> Result<PaymentMethodConfig, AppError> {
        let redacted = self
            .update(PaymentMethodConfig::KEY, PaymentMethodConfig::defaults, |methods| {
                apply_payment_update(methods, method, &update)
            })
            .await?;
        tracing::info!(%method, enabled = redacted.enabled, "Payment method updated");
        Ok(redacted)
    }

    // =========================================================================
    // Notifications and store profile
    // =========================================================================

    pub async fn notification_settings(&self) -> Result<NotificationSettings, AppError> {
        self.load(NotificationSettings::KEY, NotificationSettings::default)
            .await
    }

    pub async fn update_notification_settings(
        &self,
        settings: NotificationSettings,
    ) -> Result<NotificationSettings, AppError> {
        let mut errors = FieldErrors::new();
        for (field, event) in [
            ("order_placed", &settings.order_placed),
            ("status_changed", &settings.status_changed),
            ("delivery_assigned", &settings.delivery_assigned),
        ] {
            if event.template.trim().is_empty() {
                errors.add(field, "message template cannot be empty");
            }
        }
        errors.into_result()?;
        self.save(NotificationSettings::KEY, &settings).await?;
        Ok(settings)
    }

    pub async fn store_settings(&self) -> Result<StoreSettings, AppError> {
        self.load(StoreSettings::KEY, StoreSettings::default).await
    }

    pub async fn update_store_settings(
        &self,
        settings: StoreSettings,
    ) -> Result<StoreSettings, AppError> {
        let mut errors = FieldErrors::new();
        if settings.store_name.trim().is_empty() {
            errors.add("store_name", "store name is required");
        }
        if settings.address.trim().is_empty() {
            errors.add("address", "address is required");
        }
        if let Some(email) = non_blank(settings.email.as_deref())
            && let Err(e) = thriftstore_core::Email::parse(&email)
        {
            errors.add("email", e.to_string());
        }
        errors.into_result()?;
        self.save(StoreSettings::KEY, &settings).await?;
        Ok(settings)
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| {
        AppError::from(RepositoryError::DataCorruption(format!(
            "settings '{key}': {e}"
        )))
    })
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(format!("failed to encode settings '{key}': {e}")))
}

fn apply_payment_update(
    methods: &mut [PaymentMethodConfig],
    method: PaymentMethod,
    update: &PaymentMethodUpdate,
) -> Result<PaymentMethodConfig, AppError> {
    if update.enabled == Some(false) {
        let others_enabled = methods
            .iter()
            .any(|m| m.method != method && m.enabled);
        if !others_enabled {
            return Err(AppError::BadRequest(
                "at least one payment method must stay enabled".to_string(),
            ));
        }
    }

    let config = methods
        .iter_mut()
        .find(|m| m.method == method)
        .ok_or_else(|| AppError::NotFound(format!("payment method {method}")))?;
    if let Some(enabled) = update.enabled {
        config.enabled = enabled;
    }
    if let Some(name) = non_blank(update.display_name.as_deref()) {
        config.display_name = name;
    }
    if update.instructions.is_some() {
        config.instructions = non_blank(update.instructions.as_deref());
    }
    for (key, value) in &update.credentials {
        let value = value.trim();
        if value.is_empty() || value == PaymentMethodConfig::MASK {
            continue;
        }
        config.credentials.insert(key.clone(), value.to_owned());
    }
    Ok(config.redacted())
}

fn zone_from_form(
    id: ShippingZoneId,
    form: ShippingZoneForm,
    others: &[ShippingZone],
) -> Result<ShippingZone, AppError> {
    let mut errors = FieldErrors::new();
    let name = form.name.trim().to_owned();
    if name.is_empty() {
        errors.add("name", "name is required");
    }

    let mut regions: Vec<String> = Vec::with_capacity(form.regions.len());
    for region in form.regions.iter().filter_map(|r| non_blank(Some(r))) {
        if !regions.iter().any(|r| r.eq_ignore_ascii_case(&region)) {
            regions.push(region);
        }
    }
    if regions.is_empty() {
        errors.add("regions", "add at least one region");
    }
    if form.active
        && let Some(taken) = regions
            .iter()
            .find(|r| others.iter().any(|z| z.active && z.serves(r)))
    {
        errors.add(
            "regions",
            format!("{taken} is already served by another zone"),
        );
    }

    if form.base_fee < Decimal::ZERO {
        errors.add("base_fee", "fee cannot be negative");
    }
    if form.free_shipping_threshold.is_some_and(|t| t <= Decimal::ZERO) {
        errors.add(
            "free_shipping_threshold",
            "threshold must be greater than zero",
        );
    }
    errors.into_result()?;

    Ok(ShippingZone {
        id,
        name,
        regions,
        base_fee: round_money(form.base_fee),
        free_shipping_threshold: form.free_shipping_threshold.map(round_money),
        estimated_days: form.estimated_days,
        active: form.active,
    })
}

fn tax_from_form(id: TaxCategoryId, form: TaxCategoryForm) -> Result<TaxCategory, AppError> {
    let mut errors = FieldErrors::new();
    let name = form.name.trim().to_owned();
    if name.is_empty() {
        errors.add("name", "name is required");
    }
    if form.rate_percent < Decimal::ZERO || form.rate_percent > Decimal::ONE_HUNDRED {
        errors.add("rate_percent", "rate must be between 0 and 100");
    }
    errors.into_result()?;
    Ok(TaxCategory {
        id,
        name,
        rate_percent: form.rate_percent,
        inclusive: form.inclusive,
        is_default: form.is_default,
    })
}

fn default_zones() -> Vec<ShippingZone> {
    let zone = |id: i32, name: &str, regions: &[&str], fee: i64, free: Option<i64>, days| {
        ShippingZone {
            id: ShippingZoneId::new(id),
            name: name.to_owned(),
            regions: regions.iter().map(|r| (*r).to_owned()).collect(),
            base_fee: Decimal::new(fee, 0),
            free_shipping_threshold: free.map(|f| Decimal::new(f, 0)),
            estimated_days: days,
            active: true,
        }
    };
    vec![
        zone(1, "Nairobi Metro", &["Nairobi", "Kiambu", "Kajiado", "Machakos"], 250, Some(5000), 1),
        zone(2, "Coast", &["Mombasa", "Kilifi", "Kwale"], 450, Some(10_000), 3),
        zone(3, "Upcountry", &["Nakuru", "Kisumu", "Uasin Gishu", "Nyeri"], 400, None, 3),
    ]
}

fn default_taxes() -> Vec<TaxCategory> {
    vec![TaxCategory {
        id: TaxCategoryId::new(1),
        name: "VAT".to_owned(),
        rate_percent: Decimal::new(16, 0),
        inclusive: true,
        is_default: true,
    }]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::db::MemoryStore;

    fn zone_form(name: &str, regions: &[&str]) -> ShippingZoneForm {
        ShippingZoneForm {
            name: name.to_owned(),
            regions: regions.iter().map(|r| (*r).to_owned()).collect(),
            base_fee: Decimal::new(300, 0),
            free_shipping_threshold: None,
            estimated_days: 2,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_defaults_are_seeded_and_persisted() {
        let store = MemoryStore::new();
        let service = SettingsService::new(&store);
        assert!(store.get(ShippingZone::KEY).await.unwrap().is_none());

        let zones = service.shipping_zones(None).await.unwrap();
        assert!(!zones.is_empty());
        assert!(store.get(ShippingZone::KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_region_must_be_unique_across_active_zones() {
        let store = MemoryStore::new();
        let service = SettingsService::new(&store);
        let AppError::Validation(fields) = service
            .create_zone(zone_form("Central", &["nairobi"]))
            .await
            .unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert!(fields.get("regions").is_some());

        let zone = service
            .create_zone(zone_form("Western", &["Kakamega", "Bungoma"]))
            .await
            .unwrap();
        let resolved = service.resolve_zone("KAKAMEGA").await.unwrap().unwrap();
        assert_eq!(resolved.id, zone.id);
        assert!(service.resolve_zone("Atlantis").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_default_tax_clears_previous_default() {
        let store = MemoryStore::new();
        let service = SettingsService::new(&store);
        let zero = service
            .create_tax(TaxCategoryForm {
                name: "Zero rated".to_owned(),
                rate_percent: Decimal::ZERO,
                inclusive: false,
                is_default: true,
            })
            .await
            .unwrap();

        let taxes = service.tax_categories(None).await.unwrap();
        assert_eq!(taxes.iter().filter(|t| t.is_default).count(), 1);
        assert_eq!(service.default_tax().await.unwrap().unwrap().id, zero.id);

        service.delete_tax(zero.id).await.unwrap();
        assert!(service.default_tax().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_default_tax_cannot_be_unmarked_directly() {
        let store = MemoryStore::new();
        let service = SettingsService::new(&store);
        let vat = service.default_tax().await.unwrap().unwrap();
        let form = |is_default| TaxCategoryForm {
            name: vat.name.clone(),
            rate_percent: vat.rate_percent,
            inclusive: vat.inclusive,
            is_default,
        };

        let AppError::Validation(fields) = service.update_tax(vat.id, form(false)).await.unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert!(fields.get("is_default").is_some());
        assert_eq!(service.default_tax().await.unwrap().unwrap().id, vat.id);

        let renamed = service.update_tax(vat.id, form(true)).await.unwrap();
        assert!(renamed.is_default);

        let exempt = service
            .create_tax(TaxCategoryForm {
                name: "Exempt".to_owned(),
                rate_percent: Decimal::ZERO,
                inclusive: false,
                is_default: false,
            })
            .await
            .unwrap();
        service
            .update_tax(
                exempt.id,
                TaxCategoryForm {
                    name: "Exempt".to_owned(),
                    rate_percent: Decimal::ZERO,
                    inclusive: false,
                    is_default: true,
                },
            )
            .await
            .unwrap();
        let taxes = service.tax_categories(None).await.unwrap();
        assert_eq!(taxes.iter().filter(|t| t.is_default).count(), 1);
        assert_eq!(service.default_tax().await.unwrap().unwrap().id, exempt.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_zone_creates_are_all_kept() {
        let store = Arc::new(MemoryStore::new());
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    SettingsService::new(store.as_ref())
                        .create_zone(zone_form(
                            &format!("Route {i}"),
                            &[format!("Town {i}").as_str()],
                        ))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let zones = SettingsService::new(store.as_ref())
            .shipping_zones(None)
            .await
            .unwrap();
        assert_eq!(zones.len(), default_zones().len() + 8);
        let mut ids: Vec<i32> = zones.iter().map(|z| z.id.as_i32()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), zones.len());
        for i in 0..8 {
            assert!(zones.iter().any(|z| z.name == format!("Route {i}")));
        }
    }

    #[tokio::test]
    async fn test_tax_rate_bounds() {
        let store = MemoryStore::new();
        let service = SettingsService::new(&store);
        let result = service
            .create_tax(TaxCategoryForm {
                name: "Silly".to_owned(),
                rate_percent: Decimal::new(101, 0),
                inclusive: false,
                is_default: false,
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_credentials_are_write_only_and_mask_keeps_secret() {
        let store = MemoryStore::new();
        let service = SettingsService::new(&store);
        let mut credentials = BTreeMap::new();
        credentials.insert("consumer_key".to_owned(), "ck_live_123".to_owned());
        let shown = service
            .update_payment_method(
                PaymentMethod::Mpesa,
                PaymentMethodUpdate {
                    enabled: None,
                    display_name: None,
                    instructions: None,
                    credentials,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            shown.credentials.get("consumer_key").map(String::as_str),
            Some(PaymentMethodConfig::MASK)
        );

        let mut masked = BTreeMap::new();
        masked.insert(
            "consumer_key".to_owned(),
            PaymentMethodConfig::MASK.to_owned(),
        );
        service
            .update_payment_method(
                PaymentMethod::Mpesa,
                PaymentMethodUpdate {
                    enabled: None,
                    display_name: None,
                    instructions: None,
                    credentials: masked,
                },
            )
            .await
            .unwrap();
        let stored = store.get(PaymentMethodConfig::KEY).await.unwrap().unwrap();
        assert!(stored.to_string().contains("ck_live_123"));
    }

    #[tokio::test]
    async fn test_last_enabled_payment_method_cannot_be_disabled() {
        let store = MemoryStore::new();
        let service = SettingsService::new(&store);
        let disable = || PaymentMethodUpdate {
            enabled: Some(false),
            display_name: None,
            instructions: None,
            credentials: BTreeMap::new(),
        };
        service
            .update_payment_method(PaymentMethod::CashOnDelivery, disable())
            .await
            .unwrap();
        assert!(matches!(
            service
                .update_payment_method(PaymentMethod::Mpesa, disable())
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert!(service.is_payment_enabled(PaymentMethod::Mpesa).await.unwrap());
    }

    #[tokio::test]
    async fn test_store_settings_save_persists() {
        let store = MemoryStore::new();
        let service = SettingsService::new(&store);
        let mut settings = service.store_settings().await.unwrap();
        settings.receipt_footer = "Asante!".to_owned();
        service.update_store_settings(settings).await.unwrap();
        assert_eq!(
            service.store_settings().await.unwrap().receipt_footer,
            "Asante!"
        );
    }
}
