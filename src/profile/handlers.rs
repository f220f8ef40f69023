use axum::{
    async_trait,
    extract::{multipart::MultipartError, DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::{get, put},
    Router,
};
use tracing::instrument;

use super::{
    dto::{ChangePasswordRequest, ProfileForm, ProfileJson},
    services,
};
use crate::{
    accounts::Account,
    auth::CurrentAccount,
    error::AppError,
    images::services::{check_avatar, UploadItem, MAX_AVATAR_BYTES},
    response::{ok, ApiJson, ApiResult},
    state::AppState,
};

/// Multipart field carrying the avatar image.
const AVATAR_FIELD: &str = "avatar_url";

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_detail).put(update_profile))
        .route("/profile/password", put(update_password))
        .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 64 * 1024))
}

#[instrument(skip_all)]
pub async fn get_detail(
    State(state): State<AppState>,
    CurrentAccount(current): CurrentAccount,
) -> ApiResult<Account> {
    let account = services::get_profile(&state, current.id).await?;
    ok("OK", account)
}

#[instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentAccount(current): CurrentAccount,
    ProfileBody(form): ProfileBody,
) -> ApiResult<Account> {
    let account = services::update_profile(&state, current.id, form).await?;
    ok("Profile updated successfully", account)
}

#[instrument(skip_all)]
pub async fn update_password(
    State(state): State<AppState>,
    CurrentAccount(current): CurrentAccount,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Account> {
    let account = services::change_password(&state, current.id, payload).await?;
    ok("Your password has been successfully updated", account)
}

/// Profile update body: `multipart/form-data` (with optional avatar) or a JSON object.
/// Every rejection is reported through the JSON envelope.
pub struct ProfileBody(pub ProfileForm);

#[async_trait]
impl<S> FromRequest<S> for ProfileBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mp = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            return Ok(ProfileBody(read_form(mp).await?));
        }
        if content_type.starts_with("application/json") {
            let ApiJson(body) = ApiJson::<ProfileJson>::from_request(req, state).await?;
            return Ok(ProfileBody(body.into()));
        }
        Err(AppError::validation(
            "expected multipart/form-data or application/json body",
        ))
    }
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::validation(e.body_text())
}

async fn read_form(mut mp: Multipart) -> Result<ProfileForm, AppError> {
    let mut form = ProfileForm::default();
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fullname" => form.fullname = Some(field.text().await.map_err(bad_multipart)?),
            "birth_date" => form.birth_date = Some(field.text().await.map_err(bad_multipart)?),
            "city" => form.city = Some(field.text().await.map_err(bad_multipart)?),
            AVATAR_FIELD => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(bad_multipart)?;
                // browsers send an empty part when no file was picked
                if body.is_empty() {
                    continue;
                }
                let item = UploadItem { body, content_type };
                check_avatar(&item).map_err(AppError::Validation)?;
                form.avatar = Some(item);
            }
            _ => {}
        }
    }
    Ok(form)
}
