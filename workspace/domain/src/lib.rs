//! Repository and service layer of the expense tracker.
//!
//! Every operation takes the database connection explicitly; request-scoped
//! state such as the authenticated [`acl::Subject`] is passed in by the caller.

pub mod acl;
pub mod auth;
pub mod categories;
pub mod countries;
pub mod error;
pub mod expenses;
pub mod pagination;
pub mod roles;
pub mod throttle;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DomainError, Result};
pub use pagination::{Listing, Page, PageRequest};
