//! 路由模块

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/pg/connect", get(handlers::pg_connect))
        .route("/pg/create-table", post(handlers::pg_create_table))
        .route("/pg/insert", post(handlers::pg_insert))
        .route("/pg/read", get(handlers::pg_read))
        .route("/pg/create-db", post(handlers::pg_create_db))
        .route("/pg/drop-db", delete(handlers::pg_drop_db))
        .route("/pg/tables", get(handlers::pg_tables))
        .route("/redis/connect", get(handlers::redis_connect))
        .route("/redis/write", post(handlers::redis_write))
        .route("/redis/read", get(handlers::redis_read))
        .route("/test-all", get(handlers::test_all))
}
