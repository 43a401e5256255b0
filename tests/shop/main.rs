//! Shop integration tests: the role-scoped operations end to end against the
//! in-memory store.

mod support;
mod admin;
mod cart;
mod orders;
