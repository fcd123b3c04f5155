// Middleware for authentication, CORS, request logging

pub mod auth;
pub mod cors;
pub mod logger;

pub use auth::*;
pub use cors::*;
pub use logger::*;
