//! Typed reads and writes against the clinic dashboard endpoints.

pub mod analytics;
pub mod notifications;
pub mod tenants;

pub use analytics::AnalyticsApi;
pub use notifications::NotificationsApi;
pub use tenants::TenantsApi;
