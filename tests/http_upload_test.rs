mod helpers;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use helpers::{FixedClassifier, Harness, token_for, video_owned_by};
use serde_json::Value;
use std::sync::atomic::Ordering;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "tubely-test-boundary";

fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(path: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn video_upload_returns_updated_record() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let owner = Uuid::new_v4();
    let video = harness.seed(video_owned_by(owner)).await;

    let response = harness
        .router()
        .oneshot(upload_request(
            &format!("/api/video_upload/{}", video.id),
            Some(&token_for(owner)),
            multipart_body("video", "boots.mp4", "video/mp4", b"ftypisom....mdat"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["id"], video.id.to_string());
    let reference = json["video_url"].as_str().unwrap();
    assert!(reference.starts_with("tubely-private,landscape/"));
    assert!(reference.ends_with(".mp4"));
}

#[tokio::test]
async fn video_upload_requires_a_bearer_token() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let owner = Uuid::new_v4();
    let video = harness.seed(video_owned_by(owner)).await;
    let path = format!("/api/video_upload/{}", video.id);

    let response = harness
        .router()
        .oneshot(upload_request(
            &path,
            None,
            multipart_body("video", "boots.mp4", "video/mp4", b"ftyp"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = harness
        .router()
        .oneshot(upload_request(
            &path,
            Some("not-a-jwt"),
            multipart_body("video", "boots.mp4", "video/mp4", b"ftyp"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["status"], 401);
}

#[tokio::test]
async fn malformed_video_id_is_a_bad_request() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let owner = Uuid::new_v4();

    let response = harness
        .router()
        .oneshot(upload_request(
            "/api/video_upload/not-a-uuid",
            Some(&token_for(owner)),
            multipart_body("video", "boots.mp4", "video/mp4", b"ftyp"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid ID");
}

#[tokio::test]
async fn avi_upload_is_rejected_without_writes() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let owner = Uuid::new_v4();
    let video = harness.seed(video_owned_by(owner)).await;

    let response = harness
        .router()
        .oneshot(upload_request(
            &format!("/api/video_upload/{}", video.id),
            Some(&token_for(owner)),
            multipart_body("video", "boots.avi", "video/avi", b"RIFF....AVI "),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.videos.updates.load(Ordering::SeqCst), 0);
    assert!(harness.objects.keys().is_empty());
}

#[tokio::test]
async fn missing_file_field_is_a_bad_request() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let owner = Uuid::new_v4();
    let video = harness.seed(video_owned_by(owner)).await;

    let response = harness
        .router()
        .oneshot(upload_request(
            &format!("/api/video_upload/{}", video.id),
            Some(&token_for(owner)),
            multipart_body("attachment", "boots.mp4", "video/mp4", b"ftyp"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Unable to parse form file");
}

#[tokio::test]
async fn foreign_video_is_forbidden() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let video = harness.seed(video_owned_by(Uuid::new_v4())).await;

    let response = harness
        .router()
        .oneshot(upload_request(
            &format!("/api/video_upload/{}", video.id),
            Some(&token_for(Uuid::new_v4())),
            multipart_body("video", "boots.mp4", "video/mp4", b"ftyp"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(harness.objects.keys().is_empty());
}

#[tokio::test]
async fn oversized_video_is_payload_too_large() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let owner = Uuid::new_v4();
    let video = harness.seed(video_owned_by(owner)).await;

    let response = harness
        .router()
        .oneshot(upload_request(
            &format!("/api/video_upload/{}", video.id),
            Some(&token_for(owner)),
            multipart_body("video", "boots.mp4", "video/mp4", &[0u8; 4096]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(harness.objects.keys().is_empty());
}

#[tokio::test]
async fn thumbnail_round_trip_through_assets_route() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let owner = Uuid::new_v4();
    let video = harness.seed(video_owned_by(owner)).await;

    let response = harness
        .router()
        .oneshot(upload_request(
            &format!("/api/thumbnail_upload/{}", video.id),
            Some(&token_for(owner)),
            multipart_body("thumbnail", "cover.jpg", "image/jpeg", b"\xff\xd8\xff\xe0JFIF"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let url = json["thumbnail_url"].as_str().unwrap();
    let path = url.strip_prefix("http://localhost:8091").unwrap();
    assert!(path.starts_with("/assets/") && path.ends_with(".jpeg"));

    let response = harness
        .router()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"\xff\xd8\xff\xe0JFIF");
}

#[tokio::test]
async fn get_video_presigns_private_references() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));
    let mut video = video_owned_by(Uuid::new_v4());
    video.video_url = Some("tubely-private,portrait/abc.mp4".into());
    let video = harness.seed(video).await;

    let response = harness
        .router()
        .oneshot(
            Request::get(format!("/api/videos/{}", video.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["video_url"],
        "https://tubely-private.s3.test/portrait/abc.mp4?X-Amz-Expires=900"
    );

    let response = harness
        .router()
        .oneshot(
            Request::get(format!("/api/videos/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn probes_report_ready() {
    let harness = Harness::new(FixedClassifier::new(1920, 1080));

    let response = harness
        .router()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness
        .router()
        .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["checks"]["scratch_disk"]["ok"], true);
    assert_eq!(json["checks"]["metadata_store"]["ok"], true);
}
