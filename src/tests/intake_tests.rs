use super::{FlakyStorage, UnreliableStore};
use crate::intake::{
    parse_image_urls, parse_tags, ImageEntry, IntakeConfig, IntakeError, ProfileIntake,
    SubmissionForm, UploadedFile, SLUG_TAKEN_MESSAGE,
};
use crate::memory_store::MemoryProfileStore;
use crate::object_storage::{MemoryObjectStorage, ObjectStorage};
use crate::profile::{Gender, ProfileStatus};
use crate::slug::SlugCheckPolicy;
use crate::store::ProfileStore;
use bytes::Bytes;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

fn valid_form(name: &str) -> SubmissionForm {
    let mut form = SubmissionForm::default();
    form.set_text("name", name.to_string());
    form.set_text("gender", "girl".to_string());
    form.set_text("city", "Lisbon".to_string());
    form.set_text("description", "Loves surfing".to_string());
    form
}

fn upload(file_name: &str, content_type: &str, bytes: &'static [u8]) -> UploadedFile {
    UploadedFile {
        file_name: Some(file_name.to_string()),
        content_type: Some(content_type.to_string()),
        bytes: Bytes::from_static(bytes),
    }
}

fn create_intake() -> (ProfileIntake, Arc<MemoryProfileStore>, Arc<MemoryObjectStorage>) {
    let store = Arc::new(MemoryProfileStore::new());
    let storage = Arc::new(MemoryObjectStorage::default());
    let intake = ProfileIntake::new(store.clone(), storage.clone(), IntakeConfig::default());
    (intake, store, storage)
}

fn intake_with(store: Arc<dyn ProfileStore>, storage: Arc<dyn ObjectStorage>, config: IntakeConfig) -> ProfileIntake {
    ProfileIntake::new(store, storage, config)
}

#[test]
fn test_set_text_routes_known_fields() {
    let mut form = SubmissionForm::default();

    assert!(form.set_text("telegram_username", "@jane".to_string()));
    assert!(form.set_text("images", "https://cdn.example/a.jpg".to_string()));
    assert!(!form.set_text("favourite_colour", "blue".to_string()));

    assert_eq!(form.telegram_username.as_deref(), Some("@jane"));
    assert_eq!(
        form.images,
        vec![ImageEntry::Text("https://cdn.example/a.jpg".to_string())]
    );
}

#[test]
fn test_repeated_text_field_keeps_first_value() {
    let mut form = valid_form("Jane Doe");

    assert!(form.set_text("name", "Someone Else".to_string()));
    assert!(form.set_text("images", "https://cdn.example/a.jpg".to_string()));
    assert!(form.set_text("images", "https://cdn.example/b.jpg".to_string()));

    assert_eq!(form.name.as_deref(), Some("Jane Doe"));
    assert_eq!(form.images.len(), 2);
    assert_eq!(form.validate().unwrap().name, "Jane Doe");
}

#[test]
fn test_validate_reports_every_missing_field() {
    let mut form = SubmissionForm::default();
    form.set_text("name", "Jane".to_string());
    form.set_text("city", "   ".to_string());

    let errors = form.validate().unwrap_err();

    assert_eq!(errors.field_names(), vec!["gender", "city", "description"]);
    assert!(errors.has_missing());
    assert_eq!(errors.to_string(), "Missing required fields");
}

#[test]
fn test_validate_rejects_unknown_gender_and_bad_age() {
    let mut form = SubmissionForm::default();
    form.set_text("name", "Jane".to_string());
    form.set_text("gender", "other".to_string());
    form.set_text("city", "Lisbon".to_string());
    form.set_text("description", "Loves surfing".to_string());
    form.set_text("age", "twenty".to_string());

    let errors = form.validate().unwrap_err();

    assert_eq!(errors.field_names(), vec!["gender", "age"]);
    assert!(!errors.has_missing());
    assert_eq!(errors.to_string(), "Invalid profile submission");
}

#[test]
fn test_validate_trims_and_drops_blank_optionals() {
    let mut form = valid_form("  Jane Doe  ");
    form.set_text("headline", "   ".to_string());
    form.set_text("age", " 27 ".to_string());
    form.set_text("email", " jane@example.com ".to_string());

    let submission = form.validate().unwrap();

    assert_eq!(submission.name, "Jane Doe");
    assert_eq!(submission.gender, Gender::Girl);
    assert_eq!(submission.age, Some(27));
    assert_eq!(submission.headline, None);
    assert_eq!(submission.email.as_deref(), Some("jane@example.com"));
}

#[test]
fn test_slug_base_prefers_title_and_falls_back() {
    let mut form = valid_form("Jane Doe");
    form.set_text("title", "Surf Queen".to_string());
    assert_eq!(form.validate().unwrap().slug_base(), "surf-queen");

    let form = valid_form("!!!");
    assert_eq!(form.validate().unwrap().slug_base(), "profile");
}

#[test]
fn test_parse_tags() {
    assert_eq!(
        parse_tags("surf, travel,, music "),
        Some(vec!["surf".to_string(), "travel".to_string(), "music".to_string()])
    );
    assert_eq!(
        parse_tags(r#"["surf", " travel ", ""]"#),
        Some(vec!["surf".to_string(), "travel".to_string()])
    );
    assert_eq!(parse_tags(" , ,"), None);
    assert_eq!(parse_tags("[]"), None);
}

#[test]
fn test_parse_image_urls() {
    assert_eq!(
        parse_image_urls(" https://cdn.example/a.jpg "),
        vec!["https://cdn.example/a.jpg".to_string()]
    );
    assert_eq!(
        parse_image_urls(r#"["https://cdn.example/a.jpg","https://cdn.example/b.jpg"]"#),
        vec![
            "https://cdn.example/a.jpg".to_string(),
            "https://cdn.example/b.jpg".to_string()
        ]
    );
    assert!(parse_image_urls("   ").is_empty());
}

#[test]
fn test_parse_image_urls_drops_blank_array_entries() {
    assert_eq!(
        parse_image_urls(r#"["", "  ", " https://cdn.example/a.jpg "]"#),
        vec!["https://cdn.example/a.jpg".to_string()]
    );
    assert!(parse_image_urls(r#"["", " "]"#).is_empty());
}

#[tokio::test]
async fn test_blank_image_entries_do_not_become_the_avatar() {
    let (intake, _, _) = create_intake();
    let mut form = valid_form("Jane Doe");
    form.set_text("images", r#"["", "https://cdn.example/a.jpg"]"#.to_string());

    let profile = intake.submit(form).await.unwrap();

    assert_eq!(profile.images, vec!["https://cdn.example/a.jpg".to_string()]);
    assert_eq!(profile.avatar.as_deref(), Some("https://cdn.example/a.jpg"));
}

#[tokio::test]
async fn test_submit_creates_pending_profile() {
    let (intake, store, _) = create_intake();
    let mut form = valid_form("Jane Doe");
    form.set_text("tags", "surf, travel".to_string());

    let profile = intake.submit(form).await.unwrap();

    assert_eq!(profile.slug, "jane-doe");
    assert_eq!(profile.status, ProfileStatus::Pending);
    assert_eq!(profile.city, "Lisbon");
    assert_eq!(
        profile.tags,
        Some(vec!["surf".to_string(), "travel".to_string()])
    );
    assert!(profile.images.is_empty());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_submit_invalid_form_writes_nothing() {
    let (intake, store, _) = create_intake();
    let mut form = SubmissionForm::default();
    form.set_text("name", "Jane".to_string());

    let result = intake.submit(form).await;

    match result {
        Err(IntakeError::Validation(errors)) => {
            assert_eq!(errors.field_names(), vec!["gender", "city", "description"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_same_name_gets_numbered_slugs() {
    let (intake, _, _) = create_intake();

    let first = intake.submit(valid_form("Jane Doe")).await.unwrap();
    let second = intake.submit(valid_form("Jane Doe")).await.unwrap();
    let third = intake.submit(valid_form("jane   doe!")).await.unwrap();

    assert_eq!(first.slug, "jane-doe");
    assert_eq!(second.slug, "jane-doe-1");
    assert_eq!(third.slug, "jane-doe-2");
}

#[tokio::test]
async fn test_concurrent_submissions_get_distinct_slugs() {
    // Every store call yields, so the submissions interleave between slug
    // check and insert and collide on the unique index
    let store = Arc::new(UnreliableStore::interleaving());
    let intake = intake_with(
        store.clone(),
        Arc::new(MemoryObjectStorage::default()),
        IntakeConfig {
            slug_insert_attempts: 10,
            ..IntakeConfig::default()
        },
    );

    let results = join_all((0..10).map(|_| intake.submit(valid_form("Jane Doe")))).await;

    let slugs: HashSet<String> = results
        .into_iter()
        .map(|r| r.unwrap().slug)
        .collect();
    assert_eq!(slugs.len(), 10);
    assert!(slugs.contains("jane-doe"));
    assert!(slugs.contains("jane-doe-9"));
    assert_eq!(store.inner.len(), 10);
}

#[tokio::test]
async fn test_insert_conflict_is_retried_with_fresh_slug() {
    // The first check reports the slug as free although it was just taken
    let store = Arc::new(UnreliableStore::stale(1));
    store
        .inner
        .insert(super::new_profile("jane-doe", Gender::Girl, ProfileStatus::Pending, 0))
        .await
        .unwrap();
    let intake = intake_with(
        store.clone(),
        Arc::new(MemoryObjectStorage::default()),
        IntakeConfig::default(),
    );

    let profile = intake.submit(valid_form("Jane Doe")).await.unwrap();

    assert_eq!(profile.slug, "jane-doe-1");
    assert_eq!(store.inner.len(), 2);
}

#[tokio::test]
async fn test_insert_conflict_gives_up_after_configured_attempts() {
    let store = Arc::new(UnreliableStore::stale(usize::MAX));
    store
        .inner
        .insert(super::new_profile("jane-doe", Gender::Girl, ProfileStatus::Pending, 0))
        .await
        .unwrap();
    let intake = intake_with(
        store.clone(),
        Arc::new(MemoryObjectStorage::default()),
        IntakeConfig {
            slug_insert_attempts: 1,
            ..IntakeConfig::default()
        },
    );

    let result = intake.submit(valid_form("Jane Doe")).await;

    assert!(matches!(result, Err(IntakeError::SlugTaken)));
    assert_eq!(result.unwrap_err().to_string(), SLUG_TAKEN_MESSAGE);
    assert_eq!(store.inner.len(), 1);
}

#[tokio::test]
async fn test_failed_slug_check_is_best_effort_by_default() {
    let store = Arc::new(UnreliableStore::failing());
    let intake = intake_with(
        store.clone(),
        Arc::new(MemoryObjectStorage::default()),
        IntakeConfig::default(),
    );

    let profile = intake.submit(valid_form("Jane Doe")).await.unwrap();

    assert_eq!(profile.slug, "jane-doe");
    assert_eq!(store.inner.len(), 1);
}

#[tokio::test]
async fn test_failed_slug_check_aborts_with_fail_policy() {
    let store = Arc::new(UnreliableStore::failing());
    let intake = intake_with(
        store.clone(),
        Arc::new(MemoryObjectStorage::default()),
        IntakeConfig {
            slug_check_policy: SlugCheckPolicy::Fail,
            ..IntakeConfig::default()
        },
    );

    let result = intake.submit(valid_form("Jane Doe")).await;

    assert!(matches!(result, Err(IntakeError::SlugCheck(_))));
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn test_images_keep_submission_order() {
    let (intake, _, storage) = create_intake();
    let mut form = valid_form("Jane Doe");
    form.set_text("images", "https://cdn.example/first.jpg".to_string());
    form.push_upload(upload("beach.PNG", "image/png", b"png-bytes"));
    form.set_text(
        "images",
        r#"["https://cdn.example/third.jpg","https://cdn.example/fourth.jpg"]"#.to_string(),
    );

    let profile = intake.submit(form).await.unwrap();

    assert_eq!(profile.images.len(), 4);
    assert_eq!(profile.images[0], "https://cdn.example/first.jpg");
    assert!(profile.images[1].starts_with("memory://profile-images/profiles/"));
    assert!(profile.images[1].ends_with(".png"));
    assert_eq!(profile.images[2], "https://cdn.example/third.jpg");
    assert_eq!(profile.images[3], "https://cdn.example/fourth.jpg");
    // No explicit avatar, so the first image stands in
    assert_eq!(profile.avatar.as_deref(), Some("https://cdn.example/first.jpg"));

    let path = profile.images[1].trim_start_matches("memory://profile-images/");
    let stored = storage.get(path).unwrap();
    assert_eq!(stored.content_type, "image/png");
    assert_eq!(stored.bytes, Bytes::from_static(b"png-bytes"));
}

#[tokio::test]
async fn test_empty_uploads_are_skipped() {
    let (intake, _, storage) = create_intake();
    let mut form = valid_form("Jane Doe");
    form.push_upload(upload("", "application/octet-stream", b""));

    let profile = intake.submit(form).await.unwrap();

    assert!(profile.images.is_empty());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_failed_upload_is_skipped() {
    let store = Arc::new(MemoryProfileStore::new());
    let storage = Arc::new(FlakyStorage::failing_on(2));
    let intake = intake_with(store.clone(), storage.clone(), IntakeConfig::default());

    let mut form = valid_form("Jane Doe");
    form.push_upload(upload("one.jpg", "image/jpeg", b"1"));
    form.push_upload(upload("two.jpg", "image/jpeg", b"2"));
    form.push_upload(upload("three.webp", "image/webp", b"3"));

    let profile = intake.submit(form).await.unwrap();

    assert_eq!(profile.images.len(), 2);
    assert!(profile.images[0].ends_with(".jpg"));
    assert!(profile.images[1].ends_with(".webp"));
    assert_eq!(storage.inner.len(), 2);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_upload_without_content_type_defaults_to_jpeg() {
    let (intake, _, storage) = create_intake();
    let mut form = valid_form("Jane Doe");
    form.push_upload(UploadedFile {
        file_name: Some("photo".to_string()),
        content_type: None,
        bytes: Bytes::from_static(b"raw"),
    });

    let profile = intake.submit(form).await.unwrap();

    assert!(profile.images[0].ends_with(".jpg"));
    let path = profile.images[0].trim_start_matches("memory://profile-images/");
    assert_eq!(storage.get(path).unwrap().content_type, "image/jpeg");
}
