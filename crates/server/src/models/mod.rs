//! Domain models for the store.
//!
//! These are validated domain objects. Request payloads (`*Form`,
//! `*Update`, `*Filter`) live next to the entity they produce.

pub mod cart;
pub mod catalog;
pub mod help;
pub mod marketing;
pub mod notification;
pub mod order;
pub mod print;
pub mod scan;
pub mod session;
pub mod settings;
pub mod user;

pub use cart::{Cart, CartLineView, CartView};
pub use catalog::{
    Category, CategoryForm, NewCategory, NewProduct, Product, ProductFilter, ProductForm,
    ProductUpdate,
};
pub use help::{HelpArticle, HelpArticleForm, NewHelpArticle, RenderedArticle};
pub use marketing::{Campaign, CampaignForm, CampaignState, NewCampaign};
pub use notification::{
    DeliveryOutcome, NewNotification, NotificationEvent, NotificationRecord,
};
pub use order::{
    CheckoutRequest, DeliveryInfo, NewOrder, Order, OrderFilter, OrderItem, ShippingForm,
    ShippingInfo,
};
pub use print::{NewPrintJob, PrintJob, PrintRequest, PrinterStatus};
pub use scan::{NewScan, OfflineScan, ScanRecord, ScanState, SyncSummary};
pub use session::{CurrentUser, keys as session_keys};
pub use settings::{
    EventSettings, NotificationSettings, PaymentMethodConfig, PaymentMethodUpdate, ShippingZone,
    ShippingZoneForm, StoreSettings, TaxCategory, TaxCategoryForm,
};
pub use user::{NewUser, Permission, User, UserFilter, UserForm};
