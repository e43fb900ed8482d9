use serde::Serialize;
use utoipa::ToSchema;

pub mod accounts;
pub mod groups;
pub mod health;
pub mod proxies;
pub mod tags;

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
