//! Router-level tests: every request goes through auth, routing, the
//! engine and the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use actas_api::config::{AppConfig, InstitutionConfig};
use actas_api::middleware::metrics::ApiMetrics;
use actas_api::state::AppState;
use actas_core::{ActorId, ActorProfile, Role};
use actas_state::InMemoryStore;

const SECRET: &str = "test-secret";

struct Staff {
    mesa: ActorId,
    editor: ActorId,
    ugel: ActorId,
    publico: ActorId,
}

fn secured_app() -> (Router, Staff) {
    let staff = Staff {
        mesa: ActorId::new(),
        editor: ActorId::new(),
        ugel: ActorId::new(),
        publico: ActorId::new(),
    };
    let profile = |id, role: Role| ActorProfile {
        id,
        name: role.as_str().into(),
        roles: vec![role],
        extra_capabilities: vec![],
    };
    let institution = InstitutionConfig {
        actors: vec![
            profile(staff.mesa, Role::MesaDePartes),
            profile(staff.editor, Role::Editor),
            profile(staff.ugel, Role::Ugel),
            profile(staff.publico, Role::Publico),
        ],
        ..InstitutionConfig::default()
    };
    let config = AppConfig {
        auth_token: Some(SECRET.into()),
        ..AppConfig::default()
    };
    let state = AppState::new(config, &institution, Arc::new(InMemoryStore::new()));
    (actas_api::app(state), staff)
}

fn open_app() -> Router {
    actas_api::app(AppState::in_memory(AppConfig::default()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    actor: Option<ActorId>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("authorization", format!("Bearer {actor}:{SECRET}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn create_body() -> Value {
    json!({
        "citizen_id": Uuid::new_v4(),
        "student_id": Uuid::new_v4(),
        "applicant_context": {
            "department": "Junín",
            "province": "Huancayo",
            "district": "El Tambo",
            "school_name": "IE Santa Isabel",
            "last_year_attended": 1999,
            "level": "SECUNDARIA"
        }
    })
}

fn batch_students(math: f64) -> Value {
    json!({
        "students": [
            {
                "sequence": 1,
                "full_name": "Ana Quispe",
                "national_id": "40123456",
                "notes": [
                    { "area": "Matemática", "value": math },
                    { "area": "Comunicación", "value": 16 }
                ]
            }
        ]
    })
}

async fn fire(
    app: &Router,
    id: &str,
    event: &str,
    actor: ActorId,
    payload: Option<Value>,
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/v1/requests/{id}/events/{event}"),
        Some(actor),
        payload,
    )
    .await
}

// ── Probes and documents ─────────────────────────────────────────────

#[tokio::test]
async fn health_probes_skip_auth() {
    let (app, _) = secured_app();
    let (status, body) = send(&app, "GET", "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, _) = send(&app, "GET", "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_absent_without_recorder() {
    let (status, _) = send(&open_app(), "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_document_served() {
    let (status, body) = send(&open_app(), "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/requests/{id}/events/{event}"].is_object());
}

#[tokio::test]
async fn api_metrics_count_requests_and_errors() {
    let metrics = ApiMetrics::new();
    let app = actas_api::app_with_metrics(AppState::in_memory(AppConfig::default()), metrics.clone());
    send(&app, "POST", "/v1/requests", None, Some(create_body())).await;
    send(&app, "GET", &format!("/v1/requests/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(metrics.requests(), 2);
    assert_eq!(metrics.errors(), 1);
}

// ── Authentication and authorization ─────────────────────────────────

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (app, _) = secured_app();
    let (status, body) = send(&app, "POST", "/v1/requests", None, Some(create_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_actor_is_forbidden() {
    let (app, _) = secured_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/requests",
        Some(ActorId::new()),
        Some(create_body()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn open_mode_runs_as_administrator() {
    let app = open_app();
    let (status, body) = send(&app, "POST", "/v1/requests", None, Some(create_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let events: Vec<&str> = body["allowed_events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert_eq!(events, vec!["derivar", "cancelar", "rechazar"]);
}

// ── Request lifecycle ────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_tracking_code_and_allowed_events() {
    let (app, staff) = secured_app();
    let (status, body) =
        send(&app, "POST", "/v1/requests", Some(staff.mesa), Some(create_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["request"]["status"], "REGISTRADA");
    assert!(body["request"]["tracking_code"]
        .as_str()
        .unwrap()
        .ends_with("-000001"));
    assert_eq!(body["allowed_events"], json!(["derivar"]));
}

#[tokio::test]
async fn out_of_range_year_is_bad_request() {
    let (app, staff) = secured_app();
    let mut body = create_body();
    body["applicant_context"]["last_year_attended"] = json!(2015);
    let (status, body) = send(&app, "POST", "/v1/requests", Some(staff.mesa), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (app, staff) = secured_app();
    let (status, _) = send(
        &app,
        "POST",
        "/v1/requests",
        Some(staff.mesa),
        Some(json!({ "citizen_id": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let (app, staff) = secured_app();
    let uri = format!("/v1/requests/{}", Uuid::new_v4());
    let (status, body) = send(&app, "GET", &uri, Some(staff.mesa), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_event_name_is_bad_request() {
    let (app, staff) = secured_app();
    let (_, created) =
        send(&app, "POST", "/v1/requests", Some(staff.mesa), Some(create_body())).await;
    let id = created["request"]["id"].as_str().unwrap().to_string();
    let (status, _) = fire(&app, &id, "teleport", staff.mesa, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let (app, staff) = secured_app();

    let (_, created) =
        send(&app, "POST", "/v1/requests", Some(staff.mesa), Some(create_body())).await;
    let id = created["request"]["id"].as_str().unwrap().to_string();

    let (status, body) = fire(
        &app,
        &id,
        "derivar",
        staff.mesa,
        Some(json!({ "editor_id": staff.editor })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "DERIVADO_A_EDITOR");
    assert_eq!(body["allowed_events"], json!([]));

    let (status, _) = fire(&app, &id, "iniciarBusqueda", staff.editor, None).await;
    assert_eq!(status, StatusCode::OK);

    // Intake staff cannot report search outcomes.
    let (status, body) = fire(
        &app,
        &id,
        "actaEncontrada",
        staff.mesa,
        Some(json!({ "location_note": "Estante 4" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = fire(
        &app,
        &id,
        "actaEncontrada",
        staff.editor,
        Some(json!({ "location_note": "Estante 4, folio 12" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "ACTA_ENCONTRADA_PENDIENTE_PAGO");

    // Payment outcome pushed by the payment subsystem.
    let payment_id = Uuid::new_v4();
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/v1/payments/{payment_id}"),
        Some(staff.mesa),
        Some(json!({
            "request_id": id,
            "amount_cents": 1500,
            "method": "BANK_DEPOSIT",
            "status": "VALIDATED"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "VALIDATED");

    let (status, body) = fire(
        &app,
        &id,
        "pagoValidado",
        staff.mesa,
        Some(json!({ "payment_id": payment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "LISTO_PARA_OCR");

    // An out-of-range note blocks digitization.
    let bad_batch = Uuid::new_v4();
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/v1/academic-batches/{bad_batch}"),
        Some(staff.editor),
        Some(batch_students(25.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["valid"], false);

    let (status, body) = fire(
        &app,
        &id,
        "datosDigitalizados",
        staff.editor,
        Some(json!({ "batch_id": bad_batch })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(body["error"]["details"]["errors"][0]["code"], "NOTE_OUT_OF_RANGE");

    let batch = Uuid::new_v4();
    send(
        &app,
        "PUT",
        &format!("/v1/academic-batches/{batch}"),
        Some(staff.editor),
        Some(batch_students(14.0)),
    )
    .await;
    let (status, body) = fire(
        &app,
        &id,
        "datosDigitalizados",
        staff.editor,
        Some(json!({ "batch_id": batch })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "EN_PROCESAMIENTO_OCR");

    for (event, actor) in [
        ("enviarAValidacion", staff.editor),
        ("aprobar", staff.ugel),
        ("firmar", staff.ugel),
    ] {
        let (status, body) = fire(&app, &id, event, actor, None).await;
        assert_eq!(status, StatusCode::OK, "{event}: {body}");
    }

    let (_, view) = send(&app, "GET", &format!("/v1/requests/{id}"), Some(staff.mesa), None).await;
    assert_eq!(view["request"]["status"], "CERTIFICADO_EMITIDO");
    assert_eq!(view["allowed_events"], json!(["entregar"]));

    let (_, history) = send(
        &app,
        "GET",
        &format!("/v1/requests/{id}/history"),
        Some(staff.mesa),
        None,
    )
    .await;
    assert_eq!(history["integrity"]["chain_valid"], true);
    let entries = history["entries"].as_array().unwrap();
    let signed = entries.last().unwrap();
    assert_eq!(signed["event"], "firmar");
    let code = signed["payload_summary"]["verification_code"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, cert) = send(
        &app,
        "GET",
        &format!("/v1/certificates/{code}"),
        Some(staff.publico),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cert["request_id"], json!(id));
    assert_eq!(cert["status"], "ISSUED");

    let delivery = json!({ "receiving_party_id": "40123456", "delivery_channel": "IN_PERSON" });
    let (status, body) = fire(&app, &id, "entregar", staff.mesa, Some(delivery.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "ENTREGADO");

    let (status, body) = fire(&app, &id, "entregar", staff.mesa, Some(delivery)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_TERMINAL");
}

#[tokio::test]
async fn not_found_reason_guard_over_http() {
    let (app, staff) = secured_app();
    let (_, created) =
        send(&app, "POST", "/v1/requests", Some(staff.mesa), Some(create_body())).await;
    let id = created["request"]["id"].as_str().unwrap().to_string();
    fire(&app, &id, "derivar", staff.mesa, Some(json!({ "editor_id": staff.editor }))).await;
    fire(&app, &id, "iniciarBusqueda", staff.editor, None).await;

    let (status, body) = fire(
        &app,
        &id,
        "actaNoEncontrada",
        staff.editor,
        Some(json!({ "reason": "no existe" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "GUARD_VIOLATION");
    assert_eq!(body["error"]["details"]["condition"], "REASON_TOO_SHORT");

    let (status, body) = fire(
        &app,
        &id,
        "actaNoEncontrada",
        staff.editor,
        Some(json!({ "reason": "Folio destruido por humedad" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "ACTA_NO_ENCONTRADA");
    assert_eq!(body["allowed_events"], json!([]));
}

#[tokio::test]
async fn event_from_wrong_status_is_conflict() {
    let (app, staff) = secured_app();
    let (_, created) =
        send(&app, "POST", "/v1/requests", Some(staff.mesa), Some(create_body())).await;
    let id = created["request"]["id"].as_str().unwrap().to_string();
    let (status, body) = fire(&app, &id, "firmar", staff.ugel, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "EVENT_NOT_ALLOWED");
}

#[tokio::test]
async fn aging_reports_fresh_request_as_normal() {
    let (app, staff) = secured_app();
    let (_, created) =
        send(&app, "POST", "/v1/requests", Some(staff.mesa), Some(create_body())).await;
    let id = created["request"]["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        "GET",
        &format!("/v1/requests/{id}/aging"),
        Some(staff.editor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days_since_assignment"], 0);
    assert_eq!(body["suggested_priority"], "NORMAL");
}

// ── Collaborator endpoints ───────────────────────────────────────────

#[tokio::test]
async fn speculative_validation_reports_unmapped_area() {
    let (app, staff) = secured_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/academic-batches/validate",
        Some(staff.editor),
        Some(json!({
            "batch": {
                "students": [
                    {
                        "sequence": 1,
                        "full_name": "Luis Rojas",
                        "national_id": "41234567",
                        "notes": [{ "area": "Astronomía Avanzada", "value": 12 }]
                    }
                ]
            },
            "known_areas": [{ "code": "MAT", "name": "Matemática" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["valid"], false);
    assert_eq!(body["report"]["unmapped_areas"], json!(["Astronomía Avanzada"]));
}

#[tokio::test]
async fn batch_upload_requires_processing_capability() {
    let (app, staff) = secured_app();
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/academic-batches/{}", Uuid::new_v4()),
        Some(staff.mesa),
        Some(batch_students(12.0)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn payment_for_unknown_request_is_not_found() {
    let (app, staff) = secured_app();
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/payments/{}", Uuid::new_v4()),
        Some(staff.mesa),
        Some(json!({
            "request_id": Uuid::new_v4(),
            "amount_cents": 1500,
            "method": "CASH",
            "status": "SUBMITTED"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_with_unknown_method_is_bad_request() {
    let (app, staff) = secured_app();
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/v1/payments/{}", Uuid::new_v4()),
        Some(staff.mesa),
        Some(json!({
            "request_id": Uuid::new_v4(),
            "amount_cents": 1500,
            "method": "BARTER",
            "status": "SUBMITTED"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("BARTER"));
}

#[tokio::test]
async fn malformed_verification_code_is_bad_request() {
    let (app, staff) = secured_app();
    let (status, _) = send(&app, "GET", "/v1/certificates/abc", Some(staff.publico), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        send(&app, "GET", "/v1/certificates/ZZZ9999", Some(staff.publico), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
