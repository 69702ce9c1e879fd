//! The session layer: one owned auth state, the guard derived from it, the
//! queries gated by that guard, and the route guard sequencing it all.

pub mod context;
pub mod guard;
pub mod query;
pub mod route_guard;
pub mod state;

pub use context::SessionContext;
pub use guard::AuthGuard;
pub use query::{ProtectedQuery, QueryClient, QueryError, QueryKey};
pub use route_guard::{GuardState, GuardView, RouteGuard};
pub use state::AuthState;
