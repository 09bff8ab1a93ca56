//! CAS authentication middleware for Axum.
//!
//! Gates routes behind a CAS login and caches the authenticated principal
//! in a private session cookie, so later requests skip the CAS round trip.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use axum::{Router, middleware::from_fn_with_state, routing::get};
//! use cas_connect::middleware::{
//!     CasAuth, CasAuthConfig, CasUser, MemorySessionStore, cas_routes, require_cas_auth,
//! };
//!
//! // 1. Register the client at startup (see `CasServiceProvider`)
//! // 2. Build the middleware state
//! let auth = CasAuth::new(CasAuthConfig::from_registered()?, MemorySessionStore::new());
//!
//! // 3. Mount the login/logout routes and gate the rest
//! let app = Router::new()
//!     .route("/dashboard", get(|user: CasUser| async move { user.user }))
//!     .layer(from_fn_with_state(auth.clone(), require_cas_auth::<MemorySessionStore>))
//!     .merge(cas_routes(auth));
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod gate;
mod routes;
mod state;
mod store;
mod traits;
mod types;

pub use config::CasAuthConfig;
pub use error::AuthError;
pub use extractor::CasUser;
pub use gate::{redirect_if_authenticated, require_cas_auth};
pub use routes::cas_routes;
pub use state::CasAuth;
pub use store::MemorySessionStore;
pub use traits::SessionStore;
pub use types::NewSession;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
