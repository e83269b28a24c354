//! API Module
//!
//! HTTP handlers, routing and request timing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set`, `GET /get/:key`, `GET /get/:key/meta`, `DELETE /del/:key`
//! - `DELETE /clear`, `GET /keys`, `GET /entries`
//! - `POST /invalidate/:tag`, `POST /cleanup`, `GET /stats`
//! - `GET /health`, `GET /metrics`, `GET /alerts`, `POST /alerts/:id/resolve`, `GET /report`

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
