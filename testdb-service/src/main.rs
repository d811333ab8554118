//! PostgreSQL / Redis 连接诊断服务
//!
//! 提供以下诊断端点：
//! - PostgreSQL 连接、建表、读写、建库/删库、表列表
//! - Redis 连接、读写
//! - 一次性执行全部检查

mod cache;
mod handlers;
mod postgres;
mod routes;
mod service;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::{load_dotenv, AppConfig};
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;

const SERVICE_NAME: &str = "testdb";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DB Connection Test",
        version = "0.1.0",
        description = "PostgreSQL / Redis 连接诊断服务"
    ),
    paths(
        handlers::health_check,
        handlers::pg_connect,
        handlers::pg_create_table,
        handlers::pg_insert,
        handlers::pg_read,
        handlers::pg_create_db,
        handlers::pg_drop_db,
        handlers::pg_tables,
        handlers::redis_connect,
        handlers::redis_write,
        handlers::redis_read,
        handlers::test_all,
    ),
    components(schemas(
        common::models::TestRecord,
        common::response::Status,
        common::response::ErrorResponse,
        handlers::HealthResponse,
        handlers::PgConnectResponse,
        handlers::MessageResponse,
        handlers::InsertResponse,
        handlers::ReadResponse,
        handlers::DatabaseResponse,
        handlers::TablesResponse,
        handlers::RedisConnectResponse,
        handlers::CacheWriteResponse,
        handlers::CacheReadResponse,
        service::PgConnectSection,
        service::PgReadWriteSection,
        service::RedisSection,
    )),
    tags(
        (name = "health", description = "健康检查端点"),
        (name = "postgres", description = "PostgreSQL 诊断端点"),
        (name = "redis", description = "Redis 诊断端点"),
        (name = "diagnostics", description = "综合诊断端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    common::logging::init();

    let config = AppConfig::load_with_service(SERVICE_NAME).context("加载配置失败")?;

    // 后端客户端延迟连接，启动时不要求 PostgreSQL / Redis 可用
    let state = AppState::new(config.clone()).context("初始化后端客户端失败")?;

    let app = create_router(state);

    let addr = config.bind_addr();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务运行失败")?;

    info!(service = SERVICE_NAME, "服务已停止");
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("收到停止信号，正在关闭");
}
