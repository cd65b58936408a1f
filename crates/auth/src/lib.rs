//! `rentflow-auth`: pure authorization boundary.
//!
//! Roles form a closed set and map to capabilities through an exhaustive match,
//! so a misspelled permission cannot silently widen or narrow access.
//! This crate is decoupled from HTTP and storage; token decoding is the only
//! transport concern it carries.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize, authorize_company};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Capability;
pub use principal::{Actor, CompanyScope};
pub use roles::Role;
