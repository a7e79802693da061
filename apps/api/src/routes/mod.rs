pub mod candidates;
pub mod health;
pub mod jobs;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;

/// Upload bodies above this size are rejected before reaching a handler.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/jobs",
            post(jobs::handle_create_job).get(jobs::handle_list_jobs),
        )
        .route(
            "/api/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route("/api/jobs/:id/dashboard", get(jobs::handle_job_dashboard))
        // Candidates
        .route("/api/resumes/upload", post(candidates::handle_upload))
        .route(
            "/api/resumes/upload-batch",
            post(candidates::handle_upload_batch),
        )
        .route(
            "/api/resumes/job/:job_id",
            get(candidates::handle_list_for_job),
        )
        .route("/api/resumes/:id", get(candidates::handle_get_candidate))
        .route(
            "/api/resumes/:id/bucket",
            patch(candidates::handle_override_bucket),
        )
        .route(
            "/api/resumes/:id/send-screening-form",
            post(candidates::handle_send_screening_form),
        )
        .route(
            "/api/resumes/:id/email-status",
            patch(candidates::handle_update_email_status),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::extraction::text::testing::plain_text_extractor;
    use crate::scoring::testing::KeyedScorer;
    use crate::scoring::ScorerHandle;
    use crate::screening::testing::RecordingTransport;
    use crate::store::MemoryCandidateStore;

    const BOUNDARY: &str = "hiresense-test-boundary";

    fn app_with(scorer: ScorerHandle) -> Router {
        build_router(AppState {
            store: Arc::new(MemoryCandidateStore::new()),
            scorer,
            extractor: plain_text_extractor(),
            mailer: Arc::new(RecordingTransport::default()),
            config: Config::for_tests(),
        })
    }

    fn app() -> Router {
        app_with(ScorerHandle::Available(Arc::new(KeyedScorer {
            percentages: vec![("STRONG", 85.0), ("MID", 70.0), ("WEAK", 20.0)],
        })))
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn multipart_request(uri: &str, job_id: &str, files: &[(&str, &str, &str)]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_id\"\r\n\r\n{job_id}\r\n"
        );
        for (field, filename, content) in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_job(app: &Router, description: &str) -> String {
        let resp = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/jobs",
                json!({"title": "Backend Engineer", "description": description}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await["id"].as_str().unwrap().to_string()
    }

    async fn upload(app: &Router, job_id: &str, filename: &str, content: &str) -> Value {
        let resp = app
            .clone()
            .oneshot(multipart_request(
                "/api/resumes/upload",
                job_id,
                &[("file", filename, content)],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    #[tokio::test]
    async fn test_health_reports_scorer_availability() {
        let resp = app_with(ScorerHandle::Unavailable)
            .oneshot(get("/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["scorer_available"], false);
    }

    #[tokio::test]
    async fn test_upload_scores_and_buckets_candidate() {
        let app = app();
        let job_id = create_job(&app, "Rust, PostgreSQL").await;

        let body = upload(
            &app,
            &job_id,
            "jane.pdf",
            "Jane Q. Doe\njane.doe@example.com\nSTRONG systems work",
        )
        .await;

        assert_eq!(body["candidate"]["bucket"], "strong_fit");
        assert_eq!(body["candidate"]["email"], "jane.doe@example.com");
        assert!(body["candidate"].get("extracted_text").is_none());
        assert_eq!(body["analysis"]["match_percentage"], 85.0);
        assert_eq!(body["screening"]["status"], "not_sent");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let app = app();
        let job_id = create_job(&app, "Rust").await;

        let resp = app
            .oneshot(multipart_request(
                "/api/resumes/upload",
                &job_id,
                &[("file", "cv.docx", "STRONG")],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_to_unknown_job_is_404() {
        let resp = app()
            .oneshot(multipart_request(
                "/api/resumes/upload",
                &Uuid::new_v4().to_string(),
                &[("file", "cv.pdf", "STRONG")],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_upload_reports_failures() {
        let app = app();
        let job_id = create_job(&app, "Rust").await;

        let resp = app
            .oneshot(multipart_request(
                "/api/resumes/upload-batch",
                &job_id,
                &[
                    ("files", "a.pdf", "STRONG"),
                    ("files", "b.txt", "MID"),
                    ("files", "c.pdf", "MID"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["uploaded"].as_array().unwrap().len(), 2);
        assert_eq!(body["failed"][0]["filename"], "b.txt");
    }

    #[tokio::test]
    async fn test_listing_filters_and_sorts() {
        let app = app();
        let job_id = create_job(&app, "Rust").await;
        upload(&app, &job_id, "weak.pdf", "WEAK").await;
        upload(&app, &job_id, "strong.pdf", "STRONG").await;
        upload(&app, &job_id, "mid.pdf", "MID").await;

        let resp = app
            .clone()
            .oneshot(get(&format!("/api/resumes/job/{job_id}")))
            .await
            .unwrap();
        let all = body_json(resp).await;
        let names: Vec<&str> = all
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["candidate"]["filename"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["strong.pdf", "mid.pdf", "weak.pdf"]);

        let resp = app
            .oneshot(get(&format!(
                "/api/resumes/job/{job_id}?bucket=potential&min_match=65"
            )))
            .await
            .unwrap();
        let filtered = body_json(resp).await;
        assert_eq!(filtered.as_array().unwrap().len(), 1);
        assert_eq!(filtered[0]["candidate"]["filename"], "mid.pdf");
    }

    #[tokio::test]
    async fn test_bucket_override() {
        let app = app();
        let job_id = create_job(&app, "Rust").await;
        let uploaded = upload(&app, &job_id, "weak.pdf", "WEAK").await;
        let id = uploaded["candidate"]["id"].as_str().unwrap();

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::PATCH,
                &format!("/api/resumes/{id}/bucket"),
                json!({"bucket": "potential"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["bucket"], "potential");

        let resp = app
            .oneshot(json_request(
                Method::PATCH,
                &format!("/api/resumes/{id}/bucket"),
                json!({"bucket": "maybe"}),
            ))
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_screening_send_and_response() {
        let app = app();
        let job_id = create_job(&app, "Rust").await;
        let uploaded = upload(&app, &job_id, "a.pdf", "ada@example.com\nMID").await;
        let id = uploaded["candidate"]["id"].as_str().unwrap();

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/resumes/{id}/send-screening-form"),
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let sent = body_json(resp).await;
        assert_eq!(sent["status"], "sent");
        assert_eq!(sent["form_link"], Config::for_tests().screening_form_link);

        let resp = app
            .clone()
            .oneshot(get(&format!("/api/jobs/{job_id}/dashboard")))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["pending_screening_responses"], 1);

        let resp = app
            .oneshot(json_request(
                Method::PATCH,
                &format!("/api/resumes/{id}/email-status"),
                json!({"status": "response_received"}),
            ))
            .await
            .unwrap();
        let received = body_json(resp).await;
        assert_eq!(received["status"], "response_received");
        assert!(!received["response_received_at"].is_null());
    }

    #[tokio::test]
    async fn test_job_update_reevaluates_candidates() {
        let app = app();
        let job_id = create_job(&app, "Rust").await;
        upload(&app, &job_id, "a.pdf", "MID").await;

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/jobs/{job_id}"),
                json!({"description": "Rust and Kafka"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["job"]["description"], "Rust and Kafka");
        assert_eq!(body["reevaluation"]["rescored"], 1);
    }

    #[tokio::test]
    async fn test_job_update_surfaces_reevaluation_abort() {
        let app = app_with(ScorerHandle::Unavailable);
        let job_id = create_job(&app, "Rust").await;
        upload(&app, &job_id, "a.pdf", "MID").await;

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/jobs/{job_id}"),
                json!({"description": "Go"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = app
            .oneshot(get(&format!("/api/jobs/{job_id}")))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["description"], "Go");
    }

    #[tokio::test]
    async fn test_delete_job_removes_candidates() {
        let app = app();
        let job_id = create_job(&app, "Rust").await;
        let uploaded = upload(&app, &job_id, "a.pdf", "MID").await;
        let id = uploaded["candidate"]["id"].as_str().unwrap();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/jobs/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .oneshot(get(&format!("/api/resumes/{id}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"]["code"], "CANDIDATE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_job_requires_title() {
        let resp = app()
            .oneshot(json_request(
                Method::POST,
                "/api/jobs",
                json!({"title": "  ", "description": "Rust"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_job_title_longer_than_column_is_rejected() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/jobs",
                json!({"title": "T".repeat(256), "description": "Rust"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let job_id = create_job(&app, "Rust").await;
        let resp = app
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/jobs/{job_id}"),
                json!({"description": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
