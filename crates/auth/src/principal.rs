use serde::{Deserialize, Serialize};

use rentflow_core::{CompanyId, UserId};

use crate::Role;

/// Which companies' orders an actor may act on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "company_id", rename_all = "snake_case")]
pub enum CompanyScope {
    /// Platform staff: every company.
    Platform,
    /// A single client company.
    Company(CompanyId),
}

impl CompanyScope {
    pub fn covers(&self, company_id: CompanyId) -> bool {
        match self {
            CompanyScope::Platform => true,
            CompanyScope::Company(own) => *own == company_id,
        }
    }
}

/// A fully resolved caller, supplied by the auth provider before any
/// mutating call. The core trusts it and applies the role matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub company_scope: CompanyScope,
}

impl Actor {
    pub fn new(id: UserId, role: Role, company_scope: CompanyScope) -> Self {
        Self {
            id,
            role,
            company_scope,
        }
    }

    pub fn client(id: UserId, company_id: CompanyId) -> Self {
        Self::new(id, Role::Client, CompanyScope::Company(company_id))
    }

    pub fn fulfillment(id: UserId) -> Self {
        Self::new(id, Role::Fulfillment, CompanyScope::Platform)
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin, CompanyScope::Platform)
    }
}
