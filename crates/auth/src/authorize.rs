use thiserror::Error;

use rentflow_core::CompanyId;

use crate::{Actor, Capability, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("company scope mismatch: actor may not act on company {company_id}")]
    CompanyMismatch { company_id: CompanyId },

    #[error("forbidden: role '{role}' lacks capability '{capability}'")]
    Forbidden { role: Role, capability: Capability },
}

/// Check an operation-level capability.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(actor: &Actor, capability: Capability) -> Result<(), AuthzError> {
    if actor.role.grants(capability) {
        Ok(())
    } else {
        tracing::debug!(
            actor_id = %actor.id,
            role = %actor.role,
            capability = %capability,
            "capability denied"
        );
        Err(AuthzError::Forbidden {
            role: actor.role,
            capability,
        })
    }
}

/// Check that the actor's company scope covers the owning company of a record.
pub fn authorize_company(actor: &Actor, company_id: CompanyId) -> Result<(), AuthzError> {
    if actor.company_scope.covers(company_id) {
        Ok(())
    } else {
        Err(AuthzError::CompanyMismatch { company_id })
    }
}
