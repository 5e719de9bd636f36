//! HTTP routes for the public directory, profile intake and admin moderation

use crate::directory::{CountrySummary, PublicFilter};
use crate::error::ApiError;
use crate::intake::{SubmissionForm, UploadedFile};
use crate::moderation::{AdminAccess, AdminCredentials};
use crate::profile::{Gender, Profile, ProfileStatus};
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        HeaderName, Method, StatusCode,
    },
    response::Json,
    routing::{delete, get, patch},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;
use uuid::Uuid;

pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Form field carrying uploaded image files
const IMAGES_FIELD: &str = "images";

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(ADMIN_SECRET_HEADER),
        ]);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/profiles", get(list_profiles).post(create_profile))
        .route("/api/profiles/{slug}", get(get_profile))
        .route("/api/countries", get(list_countries))
        .route("/api/admin/profiles", get(admin_list_profiles))
        .route("/api/admin/profiles/{id}/approve", patch(approve_profile))
        .route("/api/admin/profiles/{id}/reject", patch(reject_profile))
        .route("/api/admin/profiles/{id}", delete(delete_profile))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ProfilesBody {
    profiles: Vec<Profile>,
}

#[derive(Debug, Serialize)]
struct ProfileBody {
    profile: Profile,
}

#[derive(Debug, Serialize)]
struct CountriesBody {
    countries: Vec<CountrySummary>,
}

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = AdminCredentials {
            authorization: parts
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok()),
            admin_secret: parts
                .headers
                .get(ADMIN_SECRET_HEADER)
                .and_then(|v| v.to_str().ok()),
        };

        Ok(state.admin_gate.authorize(credentials)?)
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let admin_gate = if state.admin_gate.is_enabled() {
        "enabled"
    } else {
        "disabled"
    };

    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "backend": state.backend,
        "admin_gate": admin_gate,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct PublicQuery {
    gender: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

impl PublicQuery {
    /// Blank values are treated as absent
    fn into_filter(self) -> Result<PublicFilter, ApiError> {
        let blank_to_none = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        let gender = blank_to_none(self.gender)
            .map(|g| g.parse::<Gender>())
            .transpose()
            .map_err(|_| ApiError::BadRequest("gender must be 'girl' or 'boy'".to_string()))?;

        Ok(PublicFilter {
            gender,
            city: blank_to_none(self.city),
            country: blank_to_none(self.country),
        })
    }
}

async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<PublicQuery>,
) -> Result<Json<ProfilesBody>, ApiError> {
    let filter = query.into_filter()?;
    let profiles = state
        .directory
        .list(filter)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch profiles", e))?;

    Ok(Json(ProfilesBody { profiles }))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProfileBody>, ApiError> {
    let profile = state
        .directory
        .get_by_slug(&slug)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch profile", e))?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ProfileBody { profile }))
}

async fn list_countries(State(state): State<AppState>) -> Result<Json<CountriesBody>, ApiError> {
    let countries = state
        .directory
        .countries()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch countries", e))?;

    Ok(Json(CountriesBody { countries }))
}

async fn create_profile(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProfileBody>), ApiError> {
    let form = read_submission(multipart).await?;
    let profile = state.intake.submit(form).await?;

    Ok((StatusCode::CREATED, Json(ProfileBody { profile })))
}

/// Collect the multipart body into a submission form. File parts are kept
/// only under `images`; unknown text fields are ignored.
async fn read_submission(mut multipart: Multipart) -> Result<SubmissionForm, ApiError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            if name != IMAGES_FIELD {
                debug!("Ignoring file part '{}'", name);
                continue;
            }
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            form.push_upload(UploadedFile {
                file_name: Some(file_name),
                content_type,
                bytes,
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            if !form.set_text(&name, value) {
                debug!("Ignoring unknown form field '{}'", name);
            }
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(format!("Invalid form data: {}", e.body_text()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct AdminQuery {
    status: Option<String>,
}

async fn admin_list_profiles(
    access: AdminAccess,
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<ProfilesBody>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => ProfileStatus::Pending,
        Some(raw) => raw.parse::<ProfileStatus>().map_err(|_| {
            ApiError::BadRequest("status must be 'pending', 'approved' or 'rejected'".to_string())
        })?,
    };

    let profiles = state
        .moderation
        .list_by_status(access, status)
        .await
        .map_err(|e| ApiError::from_moderation(e, "Failed to fetch profiles"))?;

    Ok(Json(ProfilesBody { profiles }))
}

/// Non-UUID ids cannot name a stored profile
fn profile_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

async fn approve_profile(
    access: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileBody>, ApiError> {
    let profile = state
        .moderation
        .approve(access, profile_id(&id)?)
        .await
        .map_err(|e| ApiError::from_moderation(e, "Failed to approve profile"))?;

    Ok(Json(ProfileBody { profile }))
}

async fn reject_profile(
    access: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileBody>, ApiError> {
    let profile = state
        .moderation
        .reject(access, profile_id(&id)?)
        .await
        .map_err(|e| ApiError::from_moderation(e, "Failed to reject profile"))?;

    Ok(Json(ProfileBody { profile }))
}

async fn delete_profile(
    access: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .moderation
        .delete(access, profile_id(&id)?)
        .await
        .map_err(|e| ApiError::from_moderation(e, "Failed to delete profile"))?;

    Ok(Json(json!({ "message": "Profile deleted" })))
}
