// Auth gateway module
// Network calls for login, registration, Google exchange and session lifecycle

mod api;
mod types;

pub use api::{AuthGateway, GoogleLogin};
