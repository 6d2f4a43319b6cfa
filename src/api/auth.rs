use validator::Validate;

use super::client::{ApiClient, Auth};
use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::AppError;
use crate::models::User;

impl ApiClient {
    /// `POST /auth/login`
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;
        self.post(&["auth", "login"], request, Auth::None).await
    }

    /// `POST /auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;
        self.post(&["auth", "register"], request, Auth::None).await
    }

    /// `GET /auth/me`, the user the stored token belongs to.
    pub async fn me(&self) -> Result<User, AppError> {
        self.get(&["auth", "me"], Auth::Bearer).await
    }

    /// `GET /auth/users`
    pub async fn users(&self) -> Result<Vec<User>, AppError> {
        self.get(&["auth", "users"], Auth::Bearer).await
    }
}
