//! Handler模块

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppResult;
use common::models::{
    CacheKeyParams, CacheWriteParams, DatabaseNameParams, DropDatabaseParams, InsertParams,
    TestRecord,
};
use common::response::{ErrorResponse, Status};
use crate::service::{DiagnosticService, TestAllReport};
use crate::state::AppState;

const TABLE_CREATED_MESSAGE: &str = "test_connection table created";

fn service(state: AppState) -> DiagnosticService {
    DiagnosticService::new(state.database, state.cache)
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: Status::Ok,
        service: state.config.service_name,
    })
}

/// PostgreSQL 连接测试
#[utoipa::path(
    get,
    path = "/pg/connect",
    tag = "postgres",
    responses(
        (status = 200, description = "连接成功", body = PgConnectResponse),
        (status = 500, description = "连接失败", body = ErrorResponse)
    )
)]
pub async fn pg_connect(State(state): State<AppState>) -> AppResult<Json<PgConnectResponse>> {
    let version = service(state).database_version().await?;
    Ok(Json(PgConnectResponse {
        status: Status::Connected,
        version,
    }))
}

/// 创建测试表（幂等）
#[utoipa::path(
    post,
    path = "/pg/create-table",
    tag = "postgres",
    responses(
        (status = 200, description = "表已存在或已创建", body = MessageResponse),
        (status = 500, description = "执行失败", body = ErrorResponse)
    )
)]
pub async fn pg_create_table(State(state): State<AppState>) -> AppResult<Json<MessageResponse>> {
    service(state).create_table().await?;
    Ok(Json(MessageResponse {
        status: Status::Ok,
        message: TABLE_CREATED_MESSAGE.to_string(),
    }))
}

/// 插入测试数据
#[utoipa::path(
    post,
    path = "/pg/insert",
    tag = "postgres",
    params(InsertParams),
    responses(
        (status = 200, description = "插入成功", body = InsertResponse),
        (status = 500, description = "执行失败", body = ErrorResponse)
    )
)]
pub async fn pg_insert(
    State(state): State<AppState>,
    Query(params): Query<InsertParams>,
) -> AppResult<Json<InsertResponse>> {
    let record = service(state).insert(&params.message).await?;
    Ok(Json(InsertResponse {
        status: Status::Inserted,
        record,
    }))
}

/// 读取最近 10 条测试数据
#[utoipa::path(
    get,
    path = "/pg/read",
    tag = "postgres",
    responses(
        (status = 200, description = "最近写入的数据", body = ReadResponse),
        (status = 500, description = "执行失败", body = ErrorResponse)
    )
)]
pub async fn pg_read(State(state): State<AppState>) -> AppResult<Json<ReadResponse>> {
    let rows = service(state).recent_records().await?;
    Ok(Json(ReadResponse {
        status: Status::Ok,
        count: rows.len(),
        rows,
    }))
}

/// 创建新数据库
#[utoipa::path(
    post,
    path = "/pg/create-db",
    tag = "postgres",
    params(DatabaseNameParams),
    responses(
        (status = 200, description = "created 或 already_exists", body = DatabaseResponse),
        (status = 500, description = "执行失败", body = ErrorResponse)
    )
)]
pub async fn pg_create_db(
    State(state): State<AppState>,
    Query(params): Query<DatabaseNameParams>,
) -> AppResult<Json<DatabaseResponse>> {
    let outcome = service(state).create_database(&params.db_name).await?;
    Ok(Json(DatabaseResponse {
        status: outcome.into(),
        db_name: params.db_name,
    }))
}

/// 删除数据库（受保护的数据库除外）
#[utoipa::path(
    delete,
    path = "/pg/drop-db",
    tag = "postgres",
    params(DropDatabaseParams),
    responses(
        (status = 200, description = "已删除", body = DatabaseResponse),
        (status = 400, description = "受保护的数据库", body = ErrorResponse),
        (status = 500, description = "执行失败", body = ErrorResponse)
    )
)]
pub async fn pg_drop_db(
    State(state): State<AppState>,
    Query(params): Query<DropDatabaseParams>,
) -> AppResult<Json<DatabaseResponse>> {
    service(state).drop_database(&params).await?;
    Ok(Json(DatabaseResponse {
        status: Status::Dropped,
        db_name: params.db_name,
    }))
}

/// 当前数据库的表列表
#[utoipa::path(
    get,
    path = "/pg/tables",
    tag = "postgres",
    responses(
        (status = 200, description = "表名列表", body = TablesResponse),
        (status = 500, description = "执行失败", body = ErrorResponse)
    )
)]
pub async fn pg_tables(State(state): State<AppState>) -> AppResult<Json<TablesResponse>> {
    let tables = service(state).list_tables().await?;
    Ok(Json(TablesResponse {
        status: Status::Ok,
        tables,
    }))
}

/// Redis 连接测试
#[utoipa::path(
    get,
    path = "/redis/connect",
    tag = "redis",
    responses(
        (status = 200, description = "连接成功", body = RedisConnectResponse),
        (status = 500, description = "连接失败", body = ErrorResponse)
    )
)]
pub async fn redis_connect(
    State(state): State<AppState>,
) -> AppResult<Json<RedisConnectResponse>> {
    let (ping, redis_version) = service(state).cache_status().await?;
    Ok(Json(RedisConnectResponse {
        status: Status::Connected,
        ping,
        redis_version,
    }))
}

/// Redis 写入测试（5 分钟 TTL）
#[utoipa::path(
    post,
    path = "/redis/write",
    tag = "redis",
    params(CacheWriteParams),
    responses(
        (status = 200, description = "写入成功", body = CacheWriteResponse),
        (status = 500, description = "执行失败", body = ErrorResponse)
    )
)]
pub async fn redis_write(
    State(state): State<AppState>,
    Query(params): Query<CacheWriteParams>,
) -> AppResult<Json<CacheWriteResponse>> {
    let ttl = service(state)
        .cache_write(&params.key, &params.value)
        .await?;
    Ok(Json(CacheWriteResponse {
        status: Status::Written,
        key: params.key,
        value: params.value,
        ttl,
    }))
}

/// Redis 读取测试
#[utoipa::path(
    get,
    path = "/redis/read",
    tag = "redis",
    params(CacheKeyParams),
    responses(
        (status = 200, description = "读取结果", body = CacheReadResponse),
        (status = 500, description = "执行失败", body = ErrorResponse)
    )
)]
pub async fn redis_read(
    State(state): State<AppState>,
    Query(params): Query<CacheKeyParams>,
) -> AppResult<Json<CacheReadResponse>> {
    let read = service(state).cache_read(&params.key).await?;
    Ok(Json(CacheReadResponse {
        status: Status::Ok,
        key: params.key,
        value: read.value,
        ttl: read.ttl,
    }))
}

/// PostgreSQL + Redis 全部测试
///
/// 每个部分独立报告 `ok` 或 `error`，始终返回 200。
#[utoipa::path(
    get,
    path = "/test-all",
    tag = "diagnostics",
    responses(
        (status = 200, description = "pg_connect / pg_readwrite / redis 三部分结果")
    )
)]
pub async fn test_all(State(state): State<AppState>) -> Json<TestAllReport> {
    let report = service(state).test_all().await;
    tracing::info!(
        pg_connect = report.pg_connect.is_ok(),
        pg_readwrite = report.pg_readwrite.is_ok(),
        redis = report.redis.is_ok(),
        "combined test finished"
    );
    Json(report)
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: Status,
    pub service: String,
}

#[derive(Serialize, ToSchema)]
pub struct PgConnectResponse {
    pub status: Status,
    /// `SELECT version()` 的结果
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub status: Status,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct InsertResponse {
    pub status: Status,
    #[serde(flatten)]
    pub record: TestRecord,
}

#[derive(Serialize, ToSchema)]
pub struct ReadResponse {
    pub status: Status,
    pub count: usize,
    pub rows: Vec<TestRecord>,
}

#[derive(Serialize, ToSchema)]
pub struct DatabaseResponse {
    pub status: Status,
    pub db_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct TablesResponse {
    pub status: Status,
    pub tables: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RedisConnectResponse {
    pub status: Status,
    pub ping: bool,
    pub redis_version: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CacheWriteResponse {
    pub status: Status,
    pub key: String,
    pub value: String,
    /// 过期时间（秒）
    pub ttl: u64,
}

#[derive(Serialize, ToSchema)]
pub struct CacheReadResponse {
    pub status: Status,
    pub key: String,
    /// 键不存在时为 null
    pub value: Option<String>,
    /// 键不存在或未设置过期时间时为 null
    pub ttl: Option<i64>,
}
