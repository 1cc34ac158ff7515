//! # Marketplace Payment Server
//!
//! The HTTP face of the marketplace settlement engine. It is responsible for:
//! * Serving the admin and seller payment dashboards (listings and aggregates).
//! * Accepting delivery confirmations from sellers and releasing the escrowed funds.
//! * Listening for courier (Hexalog) webhook calls and applying them to the shipment ledger.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/admin/*`: Admin dashboard routes, requiring an admin JWT.
//! * `/api/seller/*`: Seller routes, requiring a seller JWT.
//! * `/api/hexalog/webhook`: The courier webhook, protected by an HMAC signature check.
pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
