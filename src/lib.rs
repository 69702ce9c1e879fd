//! Client-side session management for the clinic dashboard: token storage,
//! the auth session service, one owned auth state, route and query guards.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod session;
pub mod startup;
pub mod store;
pub mod utils;

#[cfg(test)]
mod test_support;
