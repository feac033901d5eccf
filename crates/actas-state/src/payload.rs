//! # Transition Payload
//!
//! Event arguments supplied by the caller. Every field is optional at the
//! type level; each event's guard decides which fields it needs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use actas_core::{ActorId, BatchId, PaymentId};

use crate::request::DeliveryChannel;
use crate::status::EventKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionPayload {
    /// `derivar`: editor to assign. Absent leaves the request pooled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_id: Option<ActorId>,
    /// `actaEncontrada`: where the acta physically sits in the archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_note: Option<String>,
    /// `actaNoEncontrada`, `rechazar`, `cancelar`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// `pagoValidado`, `pagoRechazado`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    /// `datosDigitalizados`, `corregirYReenviar`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    /// `observar`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_text: Option<String>,
    /// `observar`: fields flagged; `corregirYReenviar`: fields corrected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// `entregar`: identity document of whoever collected the certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving_party_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_channel: Option<DeliveryChannel>,
    /// Free-form operator notes, recorded in the audit trail only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TransitionPayload {
    /// Trimmed text, `None` when absent or blank.
    pub fn text(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The subset of fields relevant to `event`, for the audit entry.
    pub fn summary(&self, event: EventKind) -> Map<String, Value> {
        let mut out = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(v) = value {
                out.insert(key.to_string(), v);
            }
        };
        let s = |v: &Option<String>| Self::text(v).map(|t| Value::String(t.to_string()));

        match event {
            EventKind::Derivar => {
                put("editor_id", self.editor_id.map(|id| Value::String(id.to_string())))
            }
            EventKind::ActaEncontrada => put("location_note", s(&self.location_note)),
            EventKind::ActaNoEncontrada | EventKind::Rechazar | EventKind::Cancelar => {
                put("reason", s(&self.reason))
            }
            EventKind::PagoValidado | EventKind::PagoRechazado => {
                put("payment_id", self.payment_id.map(|id| Value::String(id.to_string())))
            }
            EventKind::DatosDigitalizados | EventKind::CorregirYReenviar => {
                put("batch_id", self.batch_id.map(|id| Value::String(id.to_string())));
                if !self.fields.is_empty() {
                    put("corrected_fields", Some(Value::from(self.fields.clone())));
                }
            }
            EventKind::Observar => {
                put("observation_text", s(&self.observation_text));
                if !self.fields.is_empty() {
                    put("observed_fields", Some(Value::from(self.fields.clone())));
                }
            }
            EventKind::Entregar => {
                put("receiving_party_id", s(&self.receiving_party_id));
                put(
                    "delivery_channel",
                    self.delivery_channel
                        .and_then(|c| serde_json::to_value(c).ok()),
                );
            }
            EventKind::IniciarBusqueda
            | EventKind::EnviarAValidacion
            | EventKind::Aprobar
            | EventKind::Firmar => {}
        }
        put("notes", s(&self.notes));
        out
    }
}
