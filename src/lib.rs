#![doc = include_str!("../README.md")]

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod facade;
pub mod logging;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod provider;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Re-exports for convenient access
pub use backend::{Authentication, CasBackend, ClientMode, LogoutParams, ServerParams, ServerType};
pub use client::{
    CasClient, CasClientBuilder, ContinueRequest, LogoutCompletion, LogoutStrategy,
    TerminateRequest,
};
pub use config::{CasConfig, DEFAULT_CONFIG, LogTarget, ValidationMode};
pub use error::{BoxError, Error};
pub use facade::{Cas, cas};
pub use provider::{CONTAINER_KEY, CasServiceProvider, publish_config};
pub use session::{CookieParams, HostSession, SessionEnvironment};
pub use types::{AttributeValue, Attributes, SessionId};
