//! # Capability Registry
//!
//! Maps an actor to the permission codes and role codes they currently hold.
//!
//! ## Model
//!
//! A [`Capability`] is one permission tag from a closed catalog
//! (`SOLICITUDES_FIRMAR`, `SOLICITUDES_BUSCAR`, ...). A [`Role`] is a named
//! bundle of capabilities. Roles are resolved exactly once, at lookup time,
//! into a flat [`CapabilitySet`]; nothing downstream inspects role names.
//!
//! The administrative role resolves to the "all permissions" marker rather
//! than an enumerated list, so capabilities added later are granted to
//! administrators without editing the catalog.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::identity::ActorId;

// ─── Capability ─────────────────────────────────────────────────────────

/// A single permission tag an actor either holds or does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capability(&'static str);

impl Capability {
    pub const SOLICITUDES_VER: Capability = Capability("SOLICITUDES_VER");
    pub const SOLICITUDES_CREAR: Capability = Capability("SOLICITUDES_CREAR");
    pub const SOLICITUDES_EDITAR: Capability = Capability("SOLICITUDES_EDITAR");
    pub const SOLICITUDES_DERIVAR: Capability = Capability("SOLICITUDES_DERIVAR");
    pub const SOLICITUDES_BUSCAR: Capability = Capability("SOLICITUDES_BUSCAR");
    pub const SOLICITUDES_GESTIONAR: Capability = Capability("SOLICITUDES_GESTIONAR");
    pub const SOLICITUDES_VALIDAR_PAGO: Capability = Capability("SOLICITUDES_VALIDAR_PAGO");
    pub const SOLICITUDES_PROCESAR: Capability = Capability("SOLICITUDES_PROCESAR");
    pub const SOLICITUDES_VALIDAR: Capability = Capability("SOLICITUDES_VALIDAR");
    pub const SOLICITUDES_REGISTRAR: Capability = Capability("SOLICITUDES_REGISTRAR");
    pub const SOLICITUDES_FIRMAR: Capability = Capability("SOLICITUDES_FIRMAR");
    pub const SOLICITUDES_ENTREGAR: Capability = Capability("SOLICITUDES_ENTREGAR");

    /// Every capability in the catalog.
    pub const ALL: [Capability; 12] = [
        Self::SOLICITUDES_VER,
        Self::SOLICITUDES_CREAR,
        Self::SOLICITUDES_EDITAR,
        Self::SOLICITUDES_DERIVAR,
        Self::SOLICITUDES_BUSCAR,
        Self::SOLICITUDES_GESTIONAR,
        Self::SOLICITUDES_VALIDAR_PAGO,
        Self::SOLICITUDES_PROCESAR,
        Self::SOLICITUDES_VALIDAR,
        Self::SOLICITUDES_REGISTRAR,
        Self::SOLICITUDES_FIRMAR,
        Self::SOLICITUDES_ENTREGAR,
    ];

    /// Look up a catalog entry by its code.
    pub fn from_code(code: &str) -> Result<Self, CoreError> {
        let code = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.0 == code)
            .ok_or_else(|| CoreError::UnknownCapability(code.to_string()))
    }

    pub fn code(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for Capability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::from_code(&code).map_err(serde::de::Error::custom)
    }
}

// ─── Capability Set ─────────────────────────────────────────────────────

/// A flat set of capabilities resolved for one actor.
///
/// `all` is the administrative marker: when set, every membership test
/// passes regardless of `codes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    #[serde(default)]
    all: bool,
    #[serde(default)]
    codes: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The administrative "all permissions" set.
    pub fn all_permissions() -> Self {
        Self {
            all: true,
            codes: BTreeSet::new(),
        }
    }

    pub fn grant(&mut self, capability: Capability) {
        self.codes.insert(capability);
    }

    /// Fold another set into this one.
    pub fn extend(&mut self, other: &CapabilitySet) {
        self.all |= other.all;
        self.codes.extend(other.codes.iter().copied());
    }

    /// Membership test. Honors the administrative marker.
    pub fn contains(&self, capability: Capability) -> bool {
        self.all || self.codes.contains(&capability)
    }

    pub fn is_all_permissions(&self) -> bool {
        self.all
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.codes.is_empty()
    }

    /// Explicitly granted codes, in catalog-string order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.codes.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            all: false,
            codes: iter.into_iter().collect(),
        }
    }
}

// ─── Role ───────────────────────────────────────────────────────────────

/// Staff roles. Each resolves to a fixed bundle of capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Citizen-facing portal principal. Holds nothing on the staff side.
    Publico,
    /// Intake desk: routes requests, validates payments, hands over certificates.
    MesaDePartes,
    /// Archive searcher and digitizer.
    Editor,
    /// Supervising authority that reviews digitized data and signs.
    Ugel,
    /// System administrator.
    Admin,
}

const MESA_DE_PARTES_CAPABILITIES: &[Capability] = &[
    Capability::SOLICITUDES_DERIVAR,
    Capability::SOLICITUDES_VALIDAR_PAGO,
    Capability::SOLICITUDES_ENTREGAR,
    Capability::SOLICITUDES_VER,
    Capability::SOLICITUDES_CREAR,
    Capability::SOLICITUDES_EDITAR,
];

const EDITOR_CAPABILITIES: &[Capability] = &[
    Capability::SOLICITUDES_BUSCAR,
    Capability::SOLICITUDES_GESTIONAR,
    Capability::SOLICITUDES_PROCESAR,
    Capability::SOLICITUDES_VALIDAR,
    Capability::SOLICITUDES_REGISTRAR,
    Capability::SOLICITUDES_FIRMAR,
    Capability::SOLICITUDES_VER,
    Capability::SOLICITUDES_EDITAR,
];

const UGEL_CAPABILITIES: &[Capability] = &[
    Capability::SOLICITUDES_VALIDAR,
    Capability::SOLICITUDES_FIRMAR,
    Capability::SOLICITUDES_VER,
];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publico => "PUBLICO",
            Self::MesaDePartes => "MESA_DE_PARTES",
            Self::Editor => "EDITOR",
            Self::Ugel => "UGEL",
            Self::Admin => "ADMIN",
        }
    }

    /// Resolve this role into its capability set.
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            Self::Publico => CapabilitySet::empty(),
            Self::MesaDePartes => MESA_DE_PARTES_CAPABILITIES.iter().copied().collect(),
            Self::Editor => EDITOR_CAPABILITIES.iter().copied().collect(),
            Self::Ugel => UGEL_CAPABILITIES.iter().copied().collect(),
            Self::Admin => CapabilitySet::all_permissions(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLICO" => Ok(Self::Publico),
            "MESA_DE_PARTES" => Ok(Self::MesaDePartes),
            "EDITOR" => Ok(Self::Editor),
            "UGEL" => Ok(Self::Ugel),
            "ADMIN" => Ok(Self::Admin),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

// ─── Registry ───────────────────────────────────────────────────────────

/// Declarative description of a staff member, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub id: ActorId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Individual grants on top of the role bundles.
    #[serde(default)]
    pub extra_capabilities: Vec<Capability>,
}

/// The resolved view of an actor handed to the authorization gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorCapabilities {
    pub actor: ActorId,
    pub roles: Vec<Role>,
    pub capabilities: CapabilitySet,
}

impl ActorCapabilities {
    /// An actor the registry does not know: no roles, nothing granted.
    pub fn unknown(actor: ActorId) -> Self {
        Self {
            actor,
            roles: Vec::new(),
            capabilities: CapabilitySet::empty(),
        }
    }
}

/// Lookup from actor to current capabilities.
pub trait CapabilityRegistry: Send + Sync {
    /// Resolve an actor. `None` when the actor is not registered.
    fn resolve(&self, actor: &ActorId) -> Option<ActorCapabilities>;
}

/// Registry over a fixed roster, resolved eagerly at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilityRegistry {
    actors: HashMap<ActorId, ActorCapabilities>,
}

impl StaticCapabilityRegistry {
    pub fn new(profiles: impl IntoIterator<Item = ActorProfile>) -> Self {
        let mut registry = Self::default();
        for profile in profiles {
            registry.register(profile);
        }
        registry
    }

    /// Add or replace an actor.
    pub fn register(&mut self, profile: ActorProfile) {
        let mut capabilities = CapabilitySet::empty();
        for role in &profile.roles {
            capabilities.extend(&role.capabilities());
        }
        for extra in &profile.extra_capabilities {
            capabilities.grant(*extra);
        }
        self.actors.insert(
            profile.id,
            ActorCapabilities {
                actor: profile.id,
                roles: profile.roles,
                capabilities,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl CapabilityRegistry for StaticCapabilityRegistry {
    fn resolve(&self, actor: &ActorId) -> Option<ActorCapabilities> {
        self.actors.get(actor).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(roles: Vec<Role>) -> ActorProfile {
        ActorProfile {
            id: ActorId::new(),
            name: "staff".into(),
            roles,
            extra_capabilities: vec![],
        }
    }

    #[test]
    fn test_capability_from_code() {
        assert_eq!(
            Capability::from_code("SOLICITUDES_FIRMAR").unwrap(),
            Capability::SOLICITUDES_FIRMAR
        );
        assert!(matches!(
            Capability::from_code("SOLICITUDES_BORRAR"),
            Err(CoreError::UnknownCapability(_))
        ));
    }

    #[test]
    fn test_capability_serde_rejects_unknown() {
        let ok: Capability = serde_json::from_str("\"SOLICITUDES_VER\"").unwrap();
        assert_eq!(ok, Capability::SOLICITUDES_VER);
        assert!(serde_json::from_str::<Capability>("\"ROOT\"").is_err());
    }

    #[test]
    fn test_publico_holds_nothing() {
        assert!(Role::Publico.capabilities().is_empty());
    }

    #[test]
    fn test_admin_resolves_to_all_marker() {
        let set = Role::Admin.capabilities();
        assert!(set.is_all_permissions());
        for cap in Capability::ALL {
            assert!(set.contains(cap));
        }
    }

    #[test]
    fn test_mesa_de_partes_cannot_search() {
        let set = Role::MesaDePartes.capabilities();
        assert!(set.contains(Capability::SOLICITUDES_DERIVAR));
        assert!(set.contains(Capability::SOLICITUDES_ENTREGAR));
        assert!(!set.contains(Capability::SOLICITUDES_BUSCAR));
        assert!(!set.contains(Capability::SOLICITUDES_FIRMAR));
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("ugel".parse::<Role>().unwrap(), Role::Ugel);
        assert_eq!("MESA_DE_PARTES".parse::<Role>().unwrap(), Role::MesaDePartes);
        assert!("JEFE".parse::<Role>().is_err());
    }

    #[test]
    fn test_registry_unions_roles_and_extras() {
        let mut p = profile(vec![Role::Ugel]);
        p.extra_capabilities.push(Capability::SOLICITUDES_ENTREGAR);
        let id = p.id;
        let registry = StaticCapabilityRegistry::new([p]);

        let resolved = registry.resolve(&id).unwrap();
        assert_eq!(resolved.roles, vec![Role::Ugel]);
        assert!(resolved.capabilities.contains(Capability::SOLICITUDES_VALIDAR));
        assert!(resolved.capabilities.contains(Capability::SOLICITUDES_ENTREGAR));
        assert!(!resolved.capabilities.contains(Capability::SOLICITUDES_BUSCAR));
    }

    #[test]
    fn test_registry_unknown_actor() {
        let registry = StaticCapabilityRegistry::new([profile(vec![Role::Editor])]);
        assert!(registry.resolve(&ActorId::new()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_profile_from_yaml_like_json() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "roles": ["EDITOR", "MESA_DE_PARTES"],
            "extra_capabilities": ["SOLICITUDES_VALIDAR"]
        }"#;
        let p: ActorProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p.roles.len(), 2);
        assert_eq!(p.extra_capabilities, vec![Capability::SOLICITUDES_VALIDAR]);
        assert!(p.name.is_empty());
    }
}
