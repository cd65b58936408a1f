use rentflow_auth::{Actor, CompanyScope, Role};
use rentflow_core::UserId;

/// Authenticated caller of a request, resolved from its bearer token.
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn user_id(&self) -> UserId {
        self.actor.id
    }

    pub fn role(&self) -> Role {
        self.actor.role
    }

    pub fn company_scope(&self) -> CompanyScope {
        self.actor.company_scope
    }
}
