//! # HTTP Routes
//!
//! Thin handlers over [`actas_state::LifecycleEngine`]. Transition
//! authorization happens inside the engine; the non-transition endpoints
//! check a capability here before calling it.

pub mod batches;
pub mod certificates;
pub mod payments;
pub mod requests;

use actas_core::{AuthorizationGate, Capability};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// 403 unless the caller holds `required`.
pub(crate) fn require_capability(
    state: &AppState,
    caller: &CallerIdentity,
    required: Capability,
) -> Result<(), AppError> {
    let resolved = state.engine.capabilities(&caller.actor);
    if AuthorizationGate::allow(&resolved.capabilities, required) {
        Ok(())
    } else {
        tracing::warn!(actor = %caller.actor, required = %required, "capability check denied");
        Err(AppError::Forbidden(format!(
            "actor {} lacks capability {required}",
            caller.actor
        )))
    }
}
