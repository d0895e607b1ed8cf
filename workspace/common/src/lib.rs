//! Common transport-layer types shared between the API server and the client.
//! These structs mirror the handlers' request/response payloads so the client
//! can deserialize API responses without duplicating shapes.

pub mod acl;
pub mod amount;
pub mod datetime;
mod dto;
mod envelope;
pub mod pagination;
mod requests;

pub use acl::{Permission, RoleName};
pub use dto::{
    AppInfo, AuthDto, CategoryDto, CountryDto, DeletedDto, ExpenseDto, ExpenseSummaryDto,
    RoleDto, UserDto,
};
pub use envelope::{ApiPaginated, ApiResponse};
pub use pagination::{PageLink, PaginationLinks, PaginationMeta};
pub use requests::{
    CreateExpenseRequest, CreateUserRequest, LoginRequest, TokenRequest, UpdateUserRequest,
};
