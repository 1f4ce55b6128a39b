use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use candidate_portal::{
    error::Error,
    services::{
        backend_service::{BackendApi, HttpBackendApi},
        title_service::AssessmentTitleResolver,
    },
};
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;
use url::Url;

#[derive(Clone, Copy)]
enum UploadShape {
    BareUrl,
    Object,
}

async fn list_candidates() -> Json<JsonValue> {
    Json(json!({
        "success": true,
        "data": [
            { "_id": "c1", "name": "Jane Roe" },
            { "_id": "c2", "fullName": "Only In List", "assessmentsPaid": [ { "assessmentId": "a1" } ] }
        ]
    }))
}

async fn get_candidate(Path(id): Path<String>) -> impl IntoResponse {
    if id == "c1" {
        (
            StatusCode::OK,
            Json(json!({ "success": true, "data": { "_id": "c1", "name": "Jane Roe" } })),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "success": false })))
    }
}

async fn get_titles(Path(id): Path<String>) -> impl IntoResponse {
    if id == "broken" {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "boom" })))
    } else {
        (
            StatusCode::OK,
            Json(json!({ "data": [ { "_id": "a1", "title": "SQL Test" } ] })),
        )
    }
}

async fn get_user_id(Path(id): Path<String>) -> Json<JsonValue> {
    Json(json!({ "success": true, "data": { "userId": format!("user-of-{}", id) } }))
}

async fn create_certificate(Json(body): Json<JsonValue>) -> Json<JsonValue> {
    assert_eq!(body["certificateId"], "EJ-CERT-2026-abcdef12");
    Json(json!({ "data": { "certificate": { "_id": "rec-1" } } }))
}

async fn link_certificate(Json(body): Json<JsonValue>) -> Json<JsonValue> {
    assert_eq!(body["certificateId"], "rec-1");
    Json(json!({ "success": true }))
}

async fn upload(State(shape): State<UploadShape>, _body: Bytes) -> Json<JsonValue> {
    match shape {
        UploadShape::BareUrl => Json(json!("https://files.test/bare.pdf")),
        UploadShape::Object => Json(json!({ "fileUrl": "https://files.test/object.pdf" })),
    }
}

async fn spawn_backend(shape: UploadShape) -> HttpBackendApi {
    let app = Router::new()
        .route("/v1/browseCandidates/candidates", get(list_candidates))
        .route("/v1/browseCandidates/candidates/:id", get(get_candidate))
        .route("/v1/browseCandidates/assessments/:id", get(get_titles))
        .route(
            "/v1/browseCandidates/getUserIdByInterview/:id",
            get(get_user_id),
        )
        .route("/v1/browseCandidates/linkCertificate", put(link_certificate))
        .route("/v1/certificates", post(create_certificate))
        .route("/v1/upload", post(upload))
        .with_state(shape);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = Url::parse(&format!("http://{}/v1/", addr)).unwrap();
    HttpBackendApi::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn candidate_lookup_falls_back_to_the_list() {
    let api = spawn_backend(UploadShape::BareUrl).await;

    let direct = api.fetch_candidate("c1").await.unwrap().unwrap();
    assert_eq!(direct.name.as_deref(), Some("Jane Roe"));

    let scanned = api.fetch_candidate("c2").await.unwrap().unwrap();
    assert_eq!(scanned.name.as_deref(), Some("Only In List"));

    assert!(api.fetch_candidate("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn failing_title_lookup_carries_the_status() {
    let api: Arc<dyn BackendApi> = Arc::new(spawn_backend(UploadShape::BareUrl).await);

    let err = api.fetch_assessment_titles("broken").await.unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 500, .. }));

    let resolver = AssessmentTitleResolver::new(api.clone());
    let err = resolver.resolve("broken").await.unwrap_err();
    assert!(matches!(err, Error::TitleFetch { status: 500 }));

    let titles = resolver.resolve("c1").await.unwrap();
    assert_eq!(titles.get("a1"), Some("SQL Test"));
}

#[tokio::test]
async fn upload_accepts_both_response_shapes() {
    let pdf = Bytes::from_static(b"%PDF-1.4\n");

    let api = spawn_backend(UploadShape::BareUrl).await;
    let url = api.upload_pdf("cert.pdf", pdf.clone()).await.unwrap();
    assert_eq!(url, "https://files.test/bare.pdf");

    let api = spawn_backend(UploadShape::Object).await;
    let url = api.upload_pdf("cert.pdf", pdf).await.unwrap();
    assert_eq!(url, "https://files.test/object.pdf");
}

#[tokio::test]
async fn certificate_record_is_created_and_linked() {
    use candidate_portal::dto::backend_dto::{CreateCertificateRequest, LinkCertificateRequest};

    let api = spawn_backend(UploadShape::Object).await;
    let user_id = api.resolve_user_id("interview-1").await.unwrap();
    assert_eq!(user_id, "user-of-interview-1");

    let record_id = api
        .create_certificate(&CreateCertificateRequest {
            user_id: user_id.clone(),
            interview_id: "interview-1".into(),
            assessment_id: "a1".into(),
            assessment_title: "SQL Test".into(),
            certificate_link: "https://files.test/object.pdf".into(),
            certificate_id: "EJ-CERT-2026-abcdef12".into(),
            score: Some(8.0),
        })
        .await
        .unwrap();
    assert_eq!(record_id, "rec-1");

    api.link_certificate(&LinkCertificateRequest {
        user_id,
        interview_id: "interview-1".into(),
        certificate_id: record_id,
    })
    .await
    .unwrap();
}
