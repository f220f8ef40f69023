use serde::Deserialize;

use crate::images::services::UploadItem;

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "oldPassword")]
    pub old_password: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
    #[serde(rename = "newPasswordConfirmation")]
    pub new_password_confirmation: Option<String>,
}

/// Decoded multipart body of a profile update.
#[derive(Default)]
pub struct ProfileForm {
    pub fullname: Option<String>,
    pub birth_date: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<UploadItem>,
}

/// JSON form of a profile update; carries no avatar.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileJson {
    pub fullname: Option<String>,
    pub birth_date: Option<String>,
    pub city: Option<String>,
}

impl From<ProfileJson> for ProfileForm {
    fn from(j: ProfileJson) -> Self {
        Self {
            fullname: j.fullname,
            birth_date: j.birth_date,
            city: j.city,
            avatar: None,
        }
    }
}
