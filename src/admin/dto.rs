use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admin::services::UserRef;
use crate::auth::{dto::PublicUser, services::Registration};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: PublicUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleStatusRequest {
    pub user_id: Uuid,
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyUserRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
}

impl VerifyUserRequest {
    pub fn target(self) -> AppResult<UserRef> {
        match (self.user_id, self.email) {
            (Some(id), None) => Ok(UserRef::Id(id)),
            (None, Some(email)) => Ok(UserRef::Email(email)),
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Provide either userId or email, not both".into(),
            )),
            (None, None) => Err(AppError::Validation("userId or email is required".into())),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyUserResponse {
    pub success: bool,
    pub already_verified: bool,
    pub user: PublicUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResetPasswordRequest {
    pub user_id: Uuid,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub security_question: String,
    pub security_answer: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl CreateUserRequest {
    pub fn into_parts(self) -> (Registration, bool) {
        (
            Registration {
                email: self.email,
                password: self.password,
                first_name: self.first_name,
                last_name: self.last_name,
                security_question: self.security_question,
                security_answer: self.security_answer,
            },
            self.is_admin,
        )
    }
}
