use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::{HealthDependencyStatus, HealthResponse};
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = match state.postgres_pool.clone() {
        Some(pool) => check_postgres(pool).await,
        None => HealthDependencyStatus {
            status: "ok",
            backend: "memory",
            detail: None,
        },
    };

    let ready = storage.status == "ok";
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if ready { "ok" } else { "degraded" },
            ready,
            storage,
        }),
    )
}

async fn check_postgres(pool: sqlx::PgPool) -> HealthDependencyStatus {
    let check = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await;

    match check {
        Ok(_) => HealthDependencyStatus {
            status: "ok",
            backend: "postgres",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            backend: "postgres",
            detail: Some(format!("postgres check failed: {error}")),
        },
    }
}
