use axum::{extract::Extension, http::StatusCode, Json};

use crate::config::Settings;
use crate::models::chat::{HealthResponse, ServiceEndpoints, ServiceInfo};

pub async fn health_check(
    Extension(settings): Extension<Settings>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: settings.app.environment.clone(),
        }),
    )
}

pub async fn service_info(Extension(settings): Extension<Settings>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: settings.app.name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ServiceEndpoints {
            health: "/health".to_string(),
            chat: "/api/chat".to_string(),
        },
    })
}
