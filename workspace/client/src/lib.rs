//! Typed client for the expense tracker API, with a query cache on top.
//!
//! [`ApiClient`] wraps a [`Transport`] and decodes every response into the
//! DTOs of the `common` crate. [`ExpenseQueries`] caches reads per
//! [`QueryKey`] and evicts them when expenses change.

pub mod api;
pub mod error;
pub mod query;
pub mod transport;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ExpenseQuery, Session};
pub use error::{ClientError, Result};
pub use query::{ExpenseQueries, QueryKey};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
