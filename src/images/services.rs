use anyhow::Context;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

pub const AVATAR_FOLDER: &str = "profile-avatars";
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
}

/// Reject anything that is not a small png/jpeg/webp image.
pub fn check_avatar(item: &UploadItem) -> Result<(), String> {
    if ext_from_mime(&item.content_type).is_none() {
        return Err("only image/png, image/jpg, image/jpeg and image/webp are allowed".into());
    }
    if item.body.is_empty() {
        return Err("avatar file is empty".into());
    }
    if item.body.len() > MAX_AVATAR_BYTES {
        return Err("avatar must be at most 2MB".into());
    }
    Ok(())
}

/// Store an avatar as `<folder>/avatar_<account>_<unix-ms>.<ext>` and return its public URL.
pub async fn upload_avatar(
    st: &AppState,
    account_id: Uuid,
    item: UploadItem,
) -> anyhow::Result<UploadedImage> {
    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let file_name = format!("avatar_{}_{}", account_id, stamp);
    let key = format!("{}/{}.{}", AVATAR_FOLDER, file_name, ext);

    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let url = st.storage.public_url(&key);
    debug!(account_id = %account_id, %url, "avatar uploaded");
    Ok(UploadedImage { url })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
