use anyhow::anyhow;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::sheet::grading::{parse_expected_answers, GradeReport};
use crate::sheet::models::SheetRequest;
use crate::sheet::position_map::PositionMap;
use crate::sheet::service::SheetVariant;
use crate::state::AppState;

const SHEET_ID_HEADER: HeaderName = HeaderName::from_static("x-sheet-id");
const POSITION_MAP_HEADER: HeaderName = HeaderName::from_static("x-position-map");

fn png_headers(filename: &str) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(&format!("inline; filename=\"{filename}\""))?,
    );
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(anyhow!("invalid header value: {e}")))
}

/// POST /generate_gabarito
///
/// With `answerKey` the filled sheet is returned inline and nothing is stored.
/// Without it the blank sheet and its position map are persisted first.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<SheetRequest>,
) -> Result<Response, AppError> {
    let service = state.service.clone();
    let sheet = tokio::task::spawn_blocking(move || service.generate(&req))
        .await
        .map_err(|e| AppError::Internal(anyhow!("render task failed: {e}")))??;

    match sheet.variant {
        SheetVariant::AnswerKey => {
            let headers = png_headers("gabarito.png")?;
            Ok((headers, sheet.png).into_response())
        }
        SheetVariant::Blank => {
            let stored = state.store.persist(&sheet.png, &sheet.position_map).await?;
            let mut headers = png_headers(&format!("{}.png", stored.id))?;
            headers.insert(SHEET_ID_HEADER, header_value(&stored.id.to_string())?);
            headers.insert(
                POSITION_MAP_HEADER,
                header_value(&stored.position_map_path.display().to_string())?,
            );
            Ok((headers, sheet.png).into_response())
        }
    }
}

/// GET /position_maps/:id
pub async fn handle_get_position_map(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PositionMap>, AppError> {
    let map = state.store.load_position_map(id).await?;
    Ok(Json(map))
}

/// DELETE /sheets/:id
pub async fn handle_delete_sheet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /grade (multipart: `image`, `sheet_id`, `answers`)
pub async fn handle_grade(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GradeReport>, AppError> {
    let mut image: Option<Bytes> = None;
    let mut sheet_id: Option<String> = None;
    let mut answers: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        let read_err =
            |e: MultipartError| AppError::Validation(format!("Unreadable form field: {e}"));
        match name.as_deref() {
            Some("image") => image = Some(field.bytes().await.map_err(read_err)?),
            Some("sheet_id") => sheet_id = Some(field.text().await.map_err(read_err)?),
            Some("answers") => answers = Some(field.text().await.map_err(read_err)?),
            Some(other) => warn!(field = other, "Ignoring unknown form field"),
            None => {}
        }
    }

    let image = image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| AppError::Validation("image is required".to_string()))?;
    let sheet_id = sheet_id
        .ok_or_else(|| AppError::Validation("sheet_id is required".to_string()))?;
    let sheet_id = Uuid::parse_str(sheet_id.trim())
        .map_err(|_| AppError::Validation(format!("sheet_id '{sheet_id}' is not a valid id")))?;
    let answers =
        answers.ok_or_else(|| AppError::Validation("answers is required".to_string()))?;

    let map = state.store.load_position_map(sheet_id).await?;
    let expected = parse_expected_answers(&answers, &map).map_err(AppError::Validation)?;

    let grader = state.grader.as_ref().ok_or(AppError::NotImplemented)?;
    let report = grader
        .grade(&image, &map, &expected)
        .await
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    info!(
        sheet_id = %sheet_id,
        questions = report.results.len(),
        correct = report.results.iter().filter(|v| v.correct).count(),
        "Sheet graded"
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{body::Body, http::Request, Router};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::layout::TextMetrics;
    use crate::routes::build_router;
    use crate::sheet::grading::{GradeFailure, Grader, QuestionVerdict};

    /// Reports every question as marked "A".
    struct AlwaysA;

    #[async_trait]
    impl Grader for AlwaysA {
        async fn grade(
            &self,
            _image: &[u8],
            _map: &PositionMap,
            expected: &[String],
        ) -> Result<GradeReport, GradeFailure> {
            Ok(GradeReport {
                results: (1u32..)
                    .zip(expected)
                    .map(|(question, e)| QuestionVerdict {
                        question,
                        detected: Some("A".to_string()),
                        expected: e.clone(),
                        correct: e == "A",
                    })
                    .collect(),
            })
        }
    }

    struct Unreadable;

    #[async_trait]
    impl Grader for Unreadable {
        async fn grade(
            &self,
            _image: &[u8],
            _map: &PositionMap,
            _expected: &[String],
        ) -> Result<GradeReport, GradeFailure> {
            Err(GradeFailure("registration marks not found".to_string()))
        }
    }

    fn app(dir: &TempDir, grader: Option<Arc<dyn Grader>>) -> Router {
        let config = Config {
            port: 0,
            rust_log: "info".to_string(),
            artifact_dir: dir.path().to_path_buf(),
            font_path: None,
            max_questions: 200,
        };
        let mut state = AppState::new(config, TextMetrics::builtin());
        state.grader = grader;
        build_router(state)
    }

    fn json_post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn grade_request(sheet_id: &str, answers: &str, image: &[u8]) -> Request<Body> {
        let boundary = "gabarito-test-boundary";
        let mut body = Vec::new();
        for (name, value) in [("sheet_id", sheet_id), ("answers", answers)] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/grade")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn create_blank(app: &Router, questions: u32) -> Uuid {
        let response = app
            .clone()
            .oneshot(json_post(
                "/generate_gabarito",
                json!({"title": "Prova", "questionCount": questions}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[&SHEET_ID_HEADER].to_str().unwrap();
        Uuid::parse_str(id).unwrap()
    }

    fn stored_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_health_endpoints_respond() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        for uri in ["/", "/health"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_blank_sheet_is_persisted_and_served() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        let response = app
            .clone()
            .oneshot(json_post(
                "/generate_gabarito",
                json!({"tituloProva": "Prova 1", "numQuestoes": 50}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let id = Uuid::parse_str(response.headers()[&SHEET_ID_HEADER].to_str().unwrap()).unwrap();
        let map_path = response.headers()[&POSITION_MAP_HEADER].to_str().unwrap().to_string();
        assert!(map_path.ends_with(&format!("{id}.json")));
        assert_eq!(&body_bytes(response).await[..4], b"\x89PNG");
        assert_eq!(stored_files(&dir), 2);

        let response = app
            .oneshot(get(&format!("/position_maps/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let map = PositionMap::from_json(&body_bytes(response).await).unwrap();
        assert_eq!(map.question_count(), 50);
        assert_eq!(map.bubble_count(), 250);
    }

    #[tokio::test]
    async fn test_answer_key_sheet_is_inline_and_not_persisted() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, None)
            .oneshot(json_post(
                "/generate_gabarito",
                json!({"title": "Gabarito", "questionCount": 3, "answerKey": ["A", "B", "C"]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"gabarito.png\""
        );
        assert!(response.headers().get(&SHEET_ID_HEADER).is_none());
        assert_eq!(stored_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_invalid_question_count_is_rejected_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        for count in [0, -3, 201] {
            let response = app
                .clone()
                .oneshot(json_post(
                    "/generate_gabarito",
                    json!({"title": "Prova", "questionCount": count}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }
        assert_eq!(stored_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_get_distinct_ids_and_equal_maps() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        let (a, b) = tokio::join!(create_blank(&app, 40), create_blank(&app, 40));
        assert_ne!(a, b);

        let mut maps = Vec::new();
        for id in [a, b] {
            let response = app
                .clone()
                .oneshot(get(&format!("/position_maps/{id}")))
                .await
                .unwrap();
            maps.push(PositionMap::from_json(&body_bytes(response).await).unwrap());
        }
        assert_eq!(maps[0], maps[1]);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        let missing = app
            .clone()
            .oneshot(get(&format!("/position_maps/{}", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let malformed = app.oneshot(get("/position_maps/not-an-id")).await.unwrap();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_removes_sheet() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        let id = create_blank(&app, 5).await;

        let delete = |id: Uuid| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/sheets/{id}"))
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete(id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(stored_files(&dir), 0);

        let response = app.oneshot(delete(id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_grade_passes_verdicts_through() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Some(Arc::new(AlwaysA)));
        let id = create_blank(&app, 3).await;

        let response = app
            .oneshot(grade_request(&id.to_string(), r#"["A", "B", "A"]"#, b"photo"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report: GradeReport = serde_json::from_slice(&body_bytes(response).await).unwrap();
        let correct: Vec<bool> = report.results.iter().map(|v| v.correct).collect();
        assert_eq!(correct, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_grade_without_grader_is_not_implemented() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        let id = create_blank(&app, 2).await;
        let response = app
            .oneshot(grade_request(&id.to_string(), r#"["A", "B"]"#, b"photo"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_grade_unknown_sheet_is_not_found() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, Some(Arc::new(AlwaysA)))
            .oneshot(grade_request(&Uuid::new_v4().to_string(), r#"["A"]"#, b"photo"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_grade_rejects_malformed_answers() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Some(Arc::new(AlwaysA)));
        let id = create_blank(&app, 2).await;
        for answers in ["A,B", r#"["A"]"#] {
            let response = app
                .clone()
                .oneshot(grade_request(&id.to_string(), answers, b"photo"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_grader_failure_is_unprocessable() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Some(Arc::new(Unreadable)));
        let id = create_blank(&app, 2).await;
        let response = app
            .oneshot(grade_request(&id.to_string(), r#"["A", "B"]"#, b"photo"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
