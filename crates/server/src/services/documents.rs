//! Printable documents rendered with askama.

use askama::Template;
use serde::Serialize;

use thriftstore_core::{CurrencyCode, DocumentKind, OrderId, Price, ProductId};

use super::settings::SettingsService;
use crate::db::Stores;
use crate::error::AppError;
use crate::models::{Order, Product, StoreSettings};

struct ReceiptLine {
    name: String,
    price: String,
}

#[derive(Template)]
#[template(path = "documents/receipt.html")]
struct ReceiptTemplate<'a> {
    store: &'a StoreSettings,
    order: &'a Order,
    placed_on: String,
    lines: Vec<ReceiptLine>,
    subtotal: String,
    shipping_fee: String,
    tax: String,
    tax_included: bool,
    total: String,
}

#[derive(Template)]
#[template(path = "documents/shipping_label.html")]
struct ShippingLabelTemplate<'a> {
    store: &'a StoreSettings,
    order: &'a Order,
    address: String,
}

#[derive(Template)]
#[template(path = "documents/product_label.html")]
struct ProductLabelTemplate<'a> {
    store: &'a StoreSettings,
    product: &'a Product,
    price: String,
    original_price: Option<String>,
}

/// A rendered document ready to print or download.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedDocument {
    pub kind: DocumentKind,
    pub filename: String,
    pub html: String,
}

impl RenderedDocument {
    pub const CONTENT_TYPE: &'static str = "text/html; charset=utf-8";

    /// `Content-Disposition` value for downloading the document.
    #[must_use]
    pub fn attachment_header(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

pub struct DocumentService<'a> {
    stores: &'a Stores,
}

impl<'a> DocumentService<'a> {
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    /// Render `kind` for the order or product identified by `target_id`.
    pub async fn render(
        &self,
        kind: DocumentKind,
        target_id: i32,
    ) -> Result<RenderedDocument, AppError> {
        let store = SettingsService::new(self.stores.settings.as_ref())
            .store_settings()
            .await?;
        match kind {
            DocumentKind::Receipt => {
                let order = self.order(OrderId::new(target_id)).await?;
                render_receipt(&store, &order)
            }
            DocumentKind::ShippingLabel => {
                let order = self.order(OrderId::new(target_id)).await?;
                render_shipping_label(&store, &order)
            }
            DocumentKind::ProductLabel => {
                let id = ProductId::new(target_id);
                let product = self
                    .stores
                    .catalog
                    .get_product(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
                render_product_label(&store, &product)
            }
        }
    }

    async fn order(&self, id: OrderId) -> Result<Order, AppError> {
        self.stores
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }
}

fn money(amount: rust_decimal::Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

fn template_error(e: askama::Error) -> AppError {
    AppError::Internal(format!("failed to render document: {e}"))
}

pub fn render_receipt(store: &StoreSettings, order: &Order) -> Result<RenderedDocument, AppError> {
    let currency = store.currency;
    let html = ReceiptTemplate {
        store,
        order,
        placed_on: order.created_at.format("%d %b %Y %H:%M").to_string(),
        lines: order
            .items
            .iter()
            .map(|item| ReceiptLine {
                name: item.name.clone(),
                price: money(item.line_total(), currency),
            })
            .collect(),
        subtotal: money(order.subtotal, currency),
        shipping_fee: money(order.shipping_fee, currency),
        tax: money(order.tax, currency),
        tax_included: order.tax_inclusive && order.tax > rust_decimal::Decimal::ZERO,
        total: money(order.total, currency),
    }
    .render()
    .map_err(template_error)?;

    Ok(RenderedDocument {
        kind: DocumentKind::Receipt,
        filename: format!("receipt-{}.html", order.order_number),
        html,
    })
}

pub fn render_shipping_label(
    store: &StoreSettings,
    order: &Order,
) -> Result<RenderedDocument, AppError> {
    let html = ShippingLabelTemplate {
        store,
        order,
        address: order.shipping.formatted_address(),
    }
    .render()
    .map_err(template_error)?;

    Ok(RenderedDocument {
        kind: DocumentKind::ShippingLabel,
        filename: format!("shipping-label-{}.html", order.order_number),
        html,
    })
}

pub fn render_product_label(
    store: &StoreSettings,
    product: &Product,
) -> Result<RenderedDocument, AppError> {
    let html = ProductLabelTemplate {
        store,
        product,
        price: money(product.price, store.currency),
        original_price: product
            .original_price
            .filter(|o| *o > product.price)
            .map(|o| money(o, store.currency)),
    }
    .render()
    .map_err(template_error)?;

    Ok(RenderedDocument {
        kind: DocumentKind::ProductLabel,
        filename: format!("product-label-{}.html", product.barcode),
        html,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::OrderService;
    use crate::services::testing::{checkout_for, seed_product};

    async fn sample_order(stores: &Stores) -> Order {
        order_for(stores, "Kitenge Dress").await
    }

    async fn order_for(stores: &Stores, product: &str) -> Order {
        let dress = seed_product(stores, product, 1800).await;
        let mut checkout = checkout_for(&[dress.id]);
        checkout.shipping.recipient_name = Some("Akinyi Odhiambo".to_owned());
        OrderService::new(stores)
            .place_order(checkout, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_shipping_label_has_each_detail_exactly_once() {
        let stores = Stores::memory();
        let order = sample_order(&stores).await;
        let doc = DocumentService::new(&stores)
            .render(DocumentKind::ShippingLabel, order.id.as_i32())
            .await
            .unwrap();

        assert_eq!(doc.html.matches(&order.order_number).count(), 1);
        assert_eq!(doc.html.matches("Akinyi Odhiambo").count(), 1);
        assert_eq!(
            doc.html
                .matches(&order.shipping.formatted_address())
                .count(),
            1
        );
        assert_eq!(
            doc.attachment_header(),
            format!("attachment; filename=\"shipping-label-{}.html\"", order.order_number)
        );
    }

    #[tokio::test]
    async fn test_receipt_lists_items_and_totals() {
        let stores = Stores::memory();
        let order = sample_order(&stores).await;
        let doc = DocumentService::new(&stores)
            .render(DocumentKind::Receipt, order.id.as_i32())
            .await
            .unwrap();

        assert!(doc.html.contains("Kitenge Dress"));
        assert!(doc.html.contains("KSh 1,800.00"));
        assert!(doc.html.contains("M-Pesa"));
        assert!(doc.html.contains(&StoreSettings::default().receipt_footer));
    }

    async fn receipt_html(stores: &Stores, order: &Order) -> String {
        DocumentService::new(stores)
            .render(DocumentKind::Receipt, order.id.as_i32())
            .await
            .unwrap()
            .html
    }

    #[tokio::test]
    async fn test_receipt_marks_tax_included_only_for_inclusive_rates() {
        let stores = Stores::memory();
        let vat = sample_order(&stores).await;
        assert!(vat.tax_inclusive);
        assert!(receipt_html(&stores, &vat).await.contains("Tax (included)"));

        let settings = SettingsService::new(stores.settings.as_ref());
        let default = settings.default_tax().await.unwrap().unwrap();
        settings.delete_tax(default.id).await.unwrap();
        let untaxed = order_for(&stores, "Leso Wrap").await;
        assert_eq!(untaxed.tax, rust_decimal::Decimal::ZERO);
        assert!(!receipt_html(&stores, &untaxed).await.contains("(included)"));

        settings
            .create_tax(crate::models::TaxCategoryForm {
                name: "Levy".to_owned(),
                rate_percent: rust_decimal::Decimal::new(2, 0),
                inclusive: false,
                is_default: true,
            })
            .await
            .unwrap();
        let levied = order_for(&stores, "Maasai Shuka").await;
        assert!(!levied.tax_inclusive);
        assert_eq!(levied.total, levied.subtotal + levied.shipping_fee + levied.tax);
        assert!(!receipt_html(&stores, &levied).await.contains("(included)"));
    }

    #[tokio::test]
    async fn test_product_label_and_missing_target() {
        let stores = Stores::memory();
        let lamp = seed_product(&stores, "Brass Lamp", 1250).await;
        let service = DocumentService::new(&stores);
        let doc = service
            .render(DocumentKind::ProductLabel, lamp.id.as_i32())
            .await
            .unwrap();
        assert!(doc.html.contains("Brass Lamp"));
        assert!(doc.html.contains(&lamp.barcode));
        assert!(doc.html.contains("KSh 1,250.00"));

        assert!(matches!(
            service.render(DocumentKind::Receipt, 9999).await,
            Err(AppError::NotFound(_))
        ));
    }
}
