//! # Authorization Gate
//!
//! Pure predicate evaluated before every lifecycle transition:
//! does this capability set include the capability the transition needs?
//!
//! The gate never sees role names. An actor holding the administrative
//! "all permissions" set always passes.

use crate::capability::{Capability, CapabilitySet};

/// Stateless authorization check.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Allow or deny. No side effects.
    pub fn allow(capabilities: &CapabilitySet, required: Capability) -> bool {
        capabilities.contains(required)
    }

    /// Filter `candidates` down to those the set permits, preserving order.
    pub fn permitted<T>(
        capabilities: &CapabilitySet,
        candidates: impl IntoIterator<Item = (T, Capability)>,
    ) -> Vec<T> {
        candidates
            .into_iter()
            .filter(|(_, required)| Self::allow(capabilities, *required))
            .map(|(item, _)| item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Role;
    use proptest::prelude::*;

    #[test]
    fn test_empty_set_denies() {
        assert!(!AuthorizationGate::allow(
            &CapabilitySet::empty(),
            Capability::SOLICITUDES_VER
        ));
    }

    #[test]
    fn test_granted_capability_allows() {
        let set: CapabilitySet = [Capability::SOLICITUDES_BUSCAR].into_iter().collect();
        assert!(AuthorizationGate::allow(&set, Capability::SOLICITUDES_BUSCAR));
        assert!(!AuthorizationGate::allow(&set, Capability::SOLICITUDES_FIRMAR));
    }

    #[test]
    fn test_permitted_filters_in_order() {
        let set = Role::MesaDePartes.capabilities();
        let events = vec![
            ("derivar", Capability::SOLICITUDES_DERIVAR),
            ("firmar", Capability::SOLICITUDES_FIRMAR),
            ("entregar", Capability::SOLICITUDES_ENTREGAR),
        ];
        let allowed = AuthorizationGate::permitted(&set, events);
        assert_eq!(allowed, vec!["derivar", "entregar"]);
    }

    fn any_capability() -> impl Strategy<Value = Capability> {
        (0..Capability::ALL.len()).prop_map(|i| Capability::ALL[i])
    }

    proptest! {
        #[test]
        fn admin_always_passes(cap in any_capability()) {
            prop_assert!(AuthorizationGate::allow(&CapabilitySet::all_permissions(), cap));
        }

        #[test]
        fn allow_matches_membership(
            granted in proptest::collection::vec(any_capability(), 0..6),
            required in any_capability(),
        ) {
            let set: CapabilitySet = granted.iter().copied().collect();
            prop_assert_eq!(AuthorizationGate::allow(&set, required), granted.contains(&required));
        }
    }
}
