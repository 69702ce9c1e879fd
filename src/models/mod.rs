pub mod analytics;
pub mod notification;
pub mod tenant;
pub mod token;
pub mod user;

pub use tenant::TenantOption;
pub use token::TokenPair;
pub use user::{Role, UserProfile};
