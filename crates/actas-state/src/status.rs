//! # Request States and Transition Table
//!
//! ## States
//!
//! ```text
//! REGISTRADA ──derivar──▶ DERIVADO_A_EDITOR ──iniciarBusqueda──▶ EN_BUSQUEDA
//!                                                                  │
//!                        ┌────────────actaEncontrada───────────────┤
//!                        ▼                                         └─actaNoEncontrada─▶ ACTA_NO_ENCONTRADA
//!   ACTA_ENCONTRADA_PENDIENTE_PAGO ◀─┐
//!        │             └─pagoRechazado┘
//!   pagoValidado
//!        ▼
//!   LISTO_PARA_OCR ──datosDigitalizados──▶ EN_PROCESAMIENTO_OCR ──enviarAValidacion──▶ EN_VALIDACION
//!                                                                                      │    ▲
//!                                                                           observar ──┘    └── corregirYReenviar
//!                                                                                ▼              │
//!                                                                            OBSERVADO ─────────┘
//!   EN_VALIDACION ──aprobar──▶ EN_FIRMA ──firmar──▶ CERTIFICADO_EMITIDO ──entregar──▶ ENTREGADO
//! ```
//!
//! `cancelar` leaves any non-terminal state for `CANCELADO`. `rechazar`
//! leaves any state up to and including `ACTA_ENCONTRADA_PENDIENTE_PAGO`
//! for `RECHAZADO`.
//!
//! Terminal: `ACTA_NO_ENCONTRADA`, `ENTREGADO`, `RECHAZADO`, `CANCELADO`.
//!
//! Each event requires exactly one capability, independent of the source
//! state, so the table is keyed by event.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use actas_core::Capability;

// ─── Request Status ──────────────────────────────────────────────────

/// Lifecycle status of a certificate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Registrada,
    DerivadoAEditor,
    EnBusqueda,
    ActaEncontradaPendientePago,
    ActaNoEncontrada,
    ListoParaOcr,
    EnProcesamientoOcr,
    Observado,
    EnValidacion,
    EnFirma,
    CertificadoEmitido,
    Entregado,
    Rechazado,
    Cancelado,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 14] = [
        Self::Registrada,
        Self::DerivadoAEditor,
        Self::EnBusqueda,
        Self::ActaEncontradaPendientePago,
        Self::ActaNoEncontrada,
        Self::ListoParaOcr,
        Self::EnProcesamientoOcr,
        Self::Observado,
        Self::EnValidacion,
        Self::EnFirma,
        Self::CertificadoEmitido,
        Self::Entregado,
        Self::Rechazado,
        Self::Cancelado,
    ];

    /// Whether this state has no outgoing events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ActaNoEncontrada | Self::Entregado | Self::Rechazado | Self::Cancelado
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registrada => "REGISTRADA",
            Self::DerivadoAEditor => "DERIVADO_A_EDITOR",
            Self::EnBusqueda => "EN_BUSQUEDA",
            Self::ActaEncontradaPendientePago => "ACTA_ENCONTRADA_PENDIENTE_PAGO",
            Self::ActaNoEncontrada => "ACTA_NO_ENCONTRADA",
            Self::ListoParaOcr => "LISTO_PARA_OCR",
            Self::EnProcesamientoOcr => "EN_PROCESAMIENTO_OCR",
            Self::Observado => "OBSERVADO",
            Self::EnValidacion => "EN_VALIDACION",
            Self::EnFirma => "EN_FIRMA",
            Self::CertificadoEmitido => "CERTIFICADO_EMITIDO",
            Self::Entregado => "ENTREGADO",
            Self::Rechazado => "RECHAZADO",
            Self::Cancelado => "CANCELADO",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown request status: {s}"))
    }
}

// ─── Events ──────────────────────────────────────────────────────────

/// A lifecycle event an actor (or an external outcome) can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Derivar,
    IniciarBusqueda,
    ActaEncontrada,
    ActaNoEncontrada,
    PagoValidado,
    PagoRechazado,
    DatosDigitalizados,
    EnviarAValidacion,
    Aprobar,
    Observar,
    CorregirYReenviar,
    Firmar,
    Entregar,
    Cancelar,
    Rechazar,
}

use RequestStatus as S;

const NON_TERMINAL: &[RequestStatus] = &[
    S::Registrada,
    S::DerivadoAEditor,
    S::EnBusqueda,
    S::ActaEncontradaPendientePago,
    S::ListoParaOcr,
    S::EnProcesamientoOcr,
    S::Observado,
    S::EnValidacion,
    S::EnFirma,
    S::CertificadoEmitido,
];

/// States from which a request may still be rejected outright.
pub const PRE_PAYMENT: &[RequestStatus] = &[
    S::Registrada,
    S::DerivadoAEditor,
    S::EnBusqueda,
    S::ActaEncontradaPendientePago,
];

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        Self::Derivar,
        Self::IniciarBusqueda,
        Self::ActaEncontrada,
        Self::ActaNoEncontrada,
        Self::PagoValidado,
        Self::PagoRechazado,
        Self::DatosDigitalizados,
        Self::EnviarAValidacion,
        Self::Aprobar,
        Self::Observar,
        Self::CorregirYReenviar,
        Self::Firmar,
        Self::Entregar,
        Self::Cancelar,
        Self::Rechazar,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Derivar => "derivar",
            Self::IniciarBusqueda => "iniciarBusqueda",
            Self::ActaEncontrada => "actaEncontrada",
            Self::ActaNoEncontrada => "actaNoEncontrada",
            Self::PagoValidado => "pagoValidado",
            Self::PagoRechazado => "pagoRechazado",
            Self::DatosDigitalizados => "datosDigitalizados",
            Self::EnviarAValidacion => "enviarAValidacion",
            Self::Aprobar => "aprobar",
            Self::Observar => "observar",
            Self::CorregirYReenviar => "corregirYReenviar",
            Self::Firmar => "firmar",
            Self::Entregar => "entregar",
            Self::Cancelar => "cancelar",
            Self::Rechazar => "rechazar",
        }
    }

    /// The permission an actor must hold to fire this event.
    pub fn required_capability(&self) -> Capability {
        match self {
            Self::Derivar => Capability::SOLICITUDES_DERIVAR,
            Self::IniciarBusqueda | Self::ActaEncontrada | Self::ActaNoEncontrada => {
                Capability::SOLICITUDES_BUSCAR
            }
            Self::PagoValidado | Self::PagoRechazado => Capability::SOLICITUDES_VALIDAR_PAGO,
            Self::DatosDigitalizados | Self::CorregirYReenviar => Capability::SOLICITUDES_PROCESAR,
            Self::EnviarAValidacion | Self::Aprobar | Self::Observar => {
                Capability::SOLICITUDES_VALIDAR
            }
            Self::Firmar => Capability::SOLICITUDES_FIRMAR,
            Self::Entregar => Capability::SOLICITUDES_ENTREGAR,
            Self::Cancelar | Self::Rechazar => Capability::SOLICITUDES_GESTIONAR,
        }
    }

    /// States this event may fire from.
    pub fn sources(&self) -> &'static [RequestStatus] {
        match self {
            Self::Derivar => &[S::Registrada],
            Self::IniciarBusqueda => &[S::DerivadoAEditor],
            Self::ActaEncontrada | Self::ActaNoEncontrada => &[S::EnBusqueda],
            Self::PagoValidado | Self::PagoRechazado => &[S::ActaEncontradaPendientePago],
            Self::DatosDigitalizados => &[S::ListoParaOcr],
            Self::EnviarAValidacion => &[S::EnProcesamientoOcr],
            Self::Aprobar | Self::Observar => &[S::EnValidacion],
            Self::CorregirYReenviar => &[S::Observado],
            Self::Firmar => &[S::EnFirma],
            Self::Entregar => &[S::CertificadoEmitido],
            Self::Cancelar => NON_TERMINAL,
            Self::Rechazar => PRE_PAYMENT,
        }
    }

    /// Resulting state.
    pub fn target(&self) -> RequestStatus {
        match self {
            Self::Derivar => S::DerivadoAEditor,
            Self::IniciarBusqueda => S::EnBusqueda,
            Self::ActaEncontrada => S::ActaEncontradaPendientePago,
            Self::ActaNoEncontrada => S::ActaNoEncontrada,
            Self::PagoValidado => S::ListoParaOcr,
            // Re-entry: the citizen must resubmit payment.
            Self::PagoRechazado => S::ActaEncontradaPendientePago,
            Self::DatosDigitalizados => S::EnProcesamientoOcr,
            Self::EnviarAValidacion => S::EnValidacion,
            Self::Aprobar => S::EnFirma,
            Self::Observar => S::Observado,
            Self::CorregirYReenviar => S::EnValidacion,
            Self::Firmar => S::CertificadoEmitido,
            Self::Entregar => S::Entregado,
            Self::Cancelar => S::Cancelado,
            Self::Rechazar => S::Rechazado,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("unknown event: {s}"))
    }
}

// ─── Table lookups ───────────────────────────────────────────────────

/// Resulting state of firing `event` from `from`, if the table allows it.
pub fn transition(from: RequestStatus, event: EventKind) -> Option<RequestStatus> {
    event.sources().contains(&from).then(|| event.target())
}

/// Events valid from `status`, in table order.
pub fn events_from(status: RequestStatus) -> Vec<EventKind> {
    EventKind::ALL
        .into_iter()
        .filter(|event| event.sources().contains(&status))
        .collect()
}
