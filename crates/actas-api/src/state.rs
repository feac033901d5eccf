//! # Application State
//!
//! Shared state handed to every handler: the lifecycle engine over the
//! configured store, the environment config, and the Prometheus handle
//! when a recorder is installed.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use actas_core::{ActorId, ActorProfile, Role};
use actas_state::{InMemoryStore, LifecycleEngine, Store};

use crate::config::{AppConfig, InstitutionConfig};

#[derive(Clone)]
pub struct AppState {
    pub engine: LifecycleEngine,
    pub config: Arc<AppConfig>,
    pub prometheus: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("prometheus", &self.prometheus.is_some())
            .finish()
    }
}

impl AppState {
    /// Wire the engine over `store` with the institution's roster and
    /// catalog. When auth is disabled the system actor is registered as an
    /// administrator, since every request then runs as that actor.
    pub fn new(config: AppConfig, institution: &InstitutionConfig, store: Arc<dyn Store>) -> Self {
        let mut registry = institution.registry();
        if config.auth_token.is_none() {
            registry.register(ActorProfile {
                id: ActorId::SYSTEM,
                name: "system".into(),
                roles: vec![Role::Admin],
                extra_capabilities: Vec::new(),
            });
        }

        let engine = LifecycleEngine::new(store, Arc::new(registry))
            .with_catalog(institution.catalog())
            .with_validation_config(institution.validation.clone());

        Self {
            engine,
            config: Arc::new(config),
            prometheus: None,
        }
    }

    /// In-memory state with default institution settings.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            &InstitutionConfig::default(),
            Arc::new(InMemoryStore::new()),
        )
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
