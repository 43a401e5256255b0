//! HTTP transport tests: start the axum app on an ephemeral port and drive it
//! with reqwest.

mod support;
mod routes;
