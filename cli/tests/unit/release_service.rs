//! Release preparation: build/pull, bounded push retry, digest, encryption.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use teectl_cli::application::ports::StepOutcome;
use teectl_cli::application::services::release::{
    PrepareRequest, prepare, push_with_remediation,
};
use teectl_cli::domain::error::ReleaseError;
use teectl_cli::domain::release::{LogVisibility, ReleaseSource};

use crate::fakes::{FakeKms, RecordingImages, RecordingReporter};
use crate::helpers::{APP, DIGEST};

const IMAGE: &str = "docker.io/acme/app:app-1";

fn dockerfile_source() -> ReleaseSource {
    ReleaseSource::Dockerfile {
        path: PathBuf::from("svc/Dockerfile"),
        context: None,
        repository: "docker.io/acme/app".to_string(),
    }
}

fn request<'a>(source: &'a ReleaseSource, env: Option<&'a str>) -> PrepareRequest<'a> {
    PrepareRequest {
        source,
        env_contents: env,
        instance_type: "g1-small",
        log_visibility: LogVisibility::Private,
        app_id: APP,
        now_unix: 1_700_000_000,
    }
}

// ── Push remediation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn denied_push_is_remediated_and_retried_exactly_once() {
    let images = RecordingImages::default().with_pushes([
        StepOutcome::Failed("denied: requested access to the resource is denied".into()),
        StepOutcome::Succeeded,
    ]);
    let reporter = RecordingReporter::default();

    push_with_remediation(&images, &reporter, IMAGE).await.unwrap();

    assert_eq!(images.count("push"), 2);
    assert_eq!(images.count("login"), 1);
    assert_eq!(
        images.calls(),
        vec![
            format!("push {IMAGE}"),
            "login docker.io".to_string(),
            format!("push {IMAGE}"),
        ]
    );
    assert_eq!(reporter.count_containing("push denied"), 1);
}

#[tokio::test]
async fn non_permission_failure_is_not_retried() {
    let images = RecordingImages::default()
        .with_pushes([StepOutcome::Failed("net/http: TLS handshake timeout".into())]);
    let reporter = RecordingReporter::default();

    let err = push_with_remediation(&images, &reporter, IMAGE)
        .await
        .unwrap_err();

    assert_eq!(images.count("push"), 1);
    assert_eq!(images.count("login"), 0);
    assert!(matches!(
        err.downcast_ref::<ReleaseError>(),
        Some(ReleaseError::PushFailed { .. })
    ));
}

#[tokio::test]
async fn second_denial_stops_with_push_denied() {
    let images = RecordingImages::default().with_pushes([
        StepOutcome::Failed("unauthorized: authentication required".into()),
        StepOutcome::Failed("denied: insufficient_scope".into()),
        StepOutcome::Succeeded,
    ]);
    let reporter = RecordingReporter::default();

    let err = push_with_remediation(&images, &reporter, IMAGE)
        .await
        .unwrap_err();

    assert_eq!(images.count("push"), 2);
    assert!(matches!(
        err.downcast_ref::<ReleaseError>(),
        Some(ReleaseError::PushDenied { .. })
    ));
}

#[tokio::test]
async fn failed_login_stops_without_second_push() {
    let images = RecordingImages::default()
        .with_pushes([StepOutcome::Failed("denied".into())])
        .with_remediation(StepOutcome::Failed("login exited 1".into()));
    let reporter = RecordingReporter::default();

    let err = push_with_remediation(&images, &reporter, IMAGE)
        .await
        .unwrap_err();

    assert_eq!(images.count("push"), 1);
    assert!(err.to_string().contains("denied"));
}

// ── Full preparation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn dockerfile_source_builds_in_its_directory_and_pushes() {
    let images = RecordingImages::default();
    let kms = FakeKms::default();
    let reporter = RecordingReporter::default();
    let source = dockerfile_source();

    let prepared = prepare(&images, &kms, &reporter, request(&source, None))
        .await
        .unwrap();

    let calls = images.calls();
    assert!(calls[0].starts_with("build svc/Dockerfile svc docker.io/acme/app:app-"));
    assert_eq!(images.count("push"), 1);
    assert!(prepared.image_ref.starts_with("docker.io/acme/app:app-"));
    assert_eq!(prepared.descriptor.digest(), DIGEST);
    assert_eq!(prepared.descriptor.registry(), "docker.io/acme/app");
}

#[tokio::test]
async fn image_source_pulls_and_never_pushes() {
    let images = RecordingImages::default();
    let kms = FakeKms::default();
    let reporter = RecordingReporter::default();
    let source = ReleaseSource::Image("docker.io/acme/app:v2".to_string());

    let prepared = prepare(&images, &kms, &reporter, request(&source, None))
        .await
        .unwrap();

    assert_eq!(images.count("pull"), 1);
    assert_eq!(images.count("push"), 0);
    assert_eq!(images.count("build"), 0);
    assert_eq!(prepared.image_ref, "docker.io/acme/app:v2");
}

#[tokio::test]
async fn private_values_go_to_kms_and_public_values_stay_plain() {
    let images = RecordingImages::default();
    let kms = FakeKms::default();
    let reporter = RecordingReporter::default();
    let source = ReleaseSource::Image("docker.io/acme/app:v2".to_string());
    let env = "API_TOKEN=s3cret\nGREETING_PUBLIC=hello\n";

    let prepared = prepare(&images, &kms, &reporter, request(&source, Some(env)))
        .await
        .unwrap();

    let sent = kms.plaintexts();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, APP);
    let private = String::from_utf8(sent[0].1.clone()).unwrap();
    assert!(private.contains("s3cret"));
    assert!(!private.contains("hello"));

    let public = String::from_utf8(prepared.descriptor.public_env().to_vec()).unwrap();
    assert!(public.contains("GREETING_PUBLIC"));
    assert!(public.contains("g1-small"));
    assert!(!public.contains("s3cret"));
    assert!(prepared.descriptor.encrypted_env().starts_with(b"sealed:"));
}

#[tokio::test]
async fn upgrade_deadline_is_derived_from_now() {
    let images = RecordingImages::default();
    let kms = FakeKms::default();
    let reporter = RecordingReporter::default();
    let source = ReleaseSource::Image("docker.io/acme/app:v2".to_string());

    let prepared = prepare(&images, &kms, &reporter, request(&source, None))
        .await
        .unwrap();

    assert!(u64::from(prepared.descriptor.upgrade_by()) > 1_700_000_000);
}

#[tokio::test]
async fn bad_env_file_fails_before_any_image_work() {
    let images = RecordingImages::default();
    let kms = FakeKms::default();
    let reporter = RecordingReporter::default();
    let source = dockerfile_source();

    let result = prepare(
        &images,
        &kms,
        &reporter,
        request(&source, Some("this line has no equals sign")),
    )
    .await;

    assert!(result.is_err());
    assert!(images.calls().is_empty());
    assert!(kms.plaintexts().is_empty());
}

#[tokio::test]
async fn build_failure_carries_exit_code() {
    let images = RecordingImages::default().with_build_failure(2);
    let kms = FakeKms::default();
    let reporter = RecordingReporter::default();
    let source = dockerfile_source();

    let err = prepare(&images, &kms, &reporter, request(&source, None))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ReleaseError>(),
        Some(ReleaseError::BuildFailed { code: 2 })
    ));
    assert_eq!(images.count("push"), 0);
}

#[tokio::test]
async fn missing_digest_is_reported() {
    let images = RecordingImages::default().with_digests(&[]);
    let kms = FakeKms::default();
    let reporter = RecordingReporter::default();
    let source = ReleaseSource::Image("docker.io/acme/app:v2".to_string());

    let err = prepare(&images, &kms, &reporter, request(&source, None))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ReleaseError>(),
        Some(ReleaseError::DigestUnavailable { .. })
    ));
}

#[tokio::test]
async fn kms_failure_becomes_encryption_failed() {
    let images = RecordingImages::default();
    let kms = FakeKms::failing();
    let reporter = RecordingReporter::default();
    let source = ReleaseSource::Image("docker.io/acme/app:v2".to_string());

    let err = prepare(&images, &kms, &reporter, request(&source, None))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ReleaseError>(),
        Some(ReleaseError::EncryptionFailed(_))
    ));
}
