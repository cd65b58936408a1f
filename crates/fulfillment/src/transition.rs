//! Status graph, role matrix and the pure transition validator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rentflow_auth::Role;

use crate::OrderStatus;

/// Why a requested transition was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TransitionDenial {
    #[error("transition {from} -> {to} is not part of the order lifecycle")]
    NotInGraph { from: OrderStatus, to: OrderStatus },

    #[error("role '{role}' may not move an order from {from} to {to}")]
    RoleNotPermitted {
        role: Role,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// Booking side effect of crossing the committed-range boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationEffect {
    /// Entering the committed range: book every item.
    Reserve,
    /// Leaving the committed range: drop every booking.
    Release,
    None,
}

impl OrderStatus {
    /// Outgoing edges of the lifecycle graph.
    pub fn successors(self) -> &'static [OrderStatus] {
        use OrderStatus::*;

        match self {
            Draft => &[Submitted, Cancelled],
            Submitted => &[PricingReview, Quoted, Cancelled],
            PricingReview => &[PendingApproval, Quoted, Cancelled],
            PendingApproval => &[Quoted, PricingReview, Cancelled],
            Quoted => &[Confirmed, Declined, PricingReview, Cancelled],
            Confirmed => &[AwaitingFabrication, InPreparation, Cancelled],
            AwaitingFabrication => &[InPreparation, Cancelled],
            InPreparation => &[ReadyForDelivery, Cancelled],
            ReadyForDelivery => &[InTransit, Cancelled],
            InTransit => &[Delivered],
            Delivered => &[InUse],
            InUse => &[ReturnInTransit, AwaitingReturn],
            ReturnInTransit => &[AwaitingReturn],
            AwaitingReturn => &[Closed],
            Declined | Closed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        self.successors().contains(&to)
    }
}

/// Role matrix over graph edges. Admins may take any edge.
pub fn role_permits(role: Role, from: OrderStatus, to: OrderStatus) -> bool {
    use crate::OrderStatus::*;

    match role {
        Role::Admin => true,
        Role::Client => matches!((from, to), (Quoted, Confirmed) | (Quoted, Declined)),
        Role::Fulfillment => matches!(
            (from, to),
            (Confirmed, InPreparation)
                | (InPreparation, ReadyForDelivery)
                | (ReadyForDelivery, InTransit)
                | (InTransit, Delivered)
                | (AwaitingReturn, Closed)
        ),
    }
}

/// Validate a requested transition, naming the cause on refusal.
pub fn validate(
    current: OrderStatus,
    requested: OrderStatus,
    role: Role,
) -> Result<(), TransitionDenial> {
    if !current.can_transition_to(requested) {
        return Err(TransitionDenial::NotInGraph {
            from: current,
            to: requested,
        });
    }
    if !role_permits(role, current, requested) {
        return Err(TransitionDenial::RoleNotPermitted {
            role,
            from: current,
            to: requested,
        });
    }
    Ok(())
}

/// `true` iff the edge exists and the role may take it.
pub fn is_allowed(current: OrderStatus, requested: OrderStatus, role: Role) -> bool {
    validate(current, requested, role).is_ok()
}

/// Booking effect of moving from `from` to `to`.
pub fn reservation_effect(from: OrderStatus, to: OrderStatus) -> ReservationEffect {
    match (from.is_committed(), to.is_committed()) {
        (false, true) => ReservationEffect::Reserve,
        (true, false) => ReservationEffect::Release,
        _ => ReservationEffect::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::OrderStatus::*;

    #[test]
    fn terminal_statuses_have_no_successors() {
        for status in OrderStatus::ALL {
            assert_eq!(status.is_terminal(), status.successors().is_empty(), "{status}");
        }
    }

    #[test]
    fn client_may_only_answer_a_quote() {
        for from in OrderStatus::ALL {
            for &to in from.successors() {
                let expected = from == Quoted && matches!(to, Confirmed | Declined);
                assert_eq!(is_allowed(from, to, Role::Client), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn client_cannot_start_preparation() {
        assert_eq!(
            validate(Confirmed, InPreparation, Role::Client),
            Err(TransitionDenial::RoleNotPermitted {
                role: Role::Client,
                from: Confirmed,
                to: InPreparation,
            })
        );
    }

    #[test]
    fn admin_cannot_leave_the_graph() {
        assert_eq!(
            validate(Draft, Closed, Role::Admin),
            Err(TransitionDenial::NotInGraph { from: Draft, to: Closed })
        );
        assert!(is_allowed(Draft, Submitted, Role::Admin));
    }

    #[test]
    fn fulfillment_edges() {
        let edges = [
            (Confirmed, InPreparation),
            (InPreparation, ReadyForDelivery),
            (ReadyForDelivery, InTransit),
            (InTransit, Delivered),
            (AwaitingReturn, Closed),
        ];
        for (from, to) in edges {
            assert!(is_allowed(from, to, Role::Fulfillment), "{from} -> {to}");
        }
        assert!(!is_allowed(Quoted, Confirmed, Role::Fulfillment));
        assert!(!is_allowed(Delivered, InUse, Role::Fulfillment));
    }

    #[test]
    fn every_role_edge_is_a_graph_edge() {
        for role in Role::ALL {
            for from in OrderStatus::ALL {
                for to in OrderStatus::ALL {
                    if is_allowed(from, to, role) {
                        assert!(from.can_transition_to(to));
                    }
                }
            }
        }
    }

    #[test]
    fn reservation_effects_at_range_boundary() {
        assert_eq!(reservation_effect(Quoted, Confirmed), ReservationEffect::Reserve);
        assert_eq!(reservation_effect(AwaitingReturn, Closed), ReservationEffect::Release);
        assert_eq!(reservation_effect(InPreparation, Cancelled), ReservationEffect::Release);
        assert_eq!(reservation_effect(Quoted, Cancelled), ReservationEffect::None);
        assert_eq!(reservation_effect(InUse, AwaitingReturn), ReservationEffect::None);
    }

    #[test]
    fn no_edge_enters_the_committed_range_except_confirmation() {
        for from in OrderStatus::ALL {
            for &to in from.successors() {
                if reservation_effect(from, to) == ReservationEffect::Reserve {
                    assert_eq!((from, to), (Quoted, Confirmed));
                }
            }
        }
    }

    proptest! {
        #[test]
        fn admin_walk_from_submitted_only_follows_edges(choices in prop::collection::vec(0usize..8, 0..40)) {
            let mut current = Submitted;
            for choice in choices {
                let next = current.successors();
                if next.is_empty() {
                    prop_assert!(current.is_terminal());
                    break;
                }
                let to = next[choice % next.len()];
                prop_assert!(is_allowed(current, to, Role::Admin));
                current = to;
            }
        }

        #[test]
        fn denial_reason_is_consistent(from in 0usize..17, to in 0usize..17, role in 0usize..3) {
            let (from, to, role) = (OrderStatus::ALL[from], OrderStatus::ALL[to], Role::ALL[role]);
            match validate(from, to, role) {
                Ok(()) => prop_assert!(from.can_transition_to(to) && role_permits(role, from, to)),
                Err(TransitionDenial::NotInGraph { .. }) => prop_assert!(!from.can_transition_to(to)),
                Err(TransitionDenial::RoleNotPermitted { .. }) => {
                    prop_assert!(from.can_transition_to(to));
                    prop_assert!(!role_permits(role, from, to));
                }
            }
        }
    }
}
