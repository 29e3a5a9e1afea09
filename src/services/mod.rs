pub mod auth_service;
pub mod auth_service_impl;
pub mod validation;

pub use auth_service::{AuthError, AuthService, Registration};
pub use auth_service_impl::SeaOrmAuthService;
