//! 连接诊断服务公共模块
//!
//! 提供服务共享的基础设施：
//! - 环境变量配置加载
//! - 错误类型与 HTTP 映射
//! - 日志初始化
//! - 请求 ID 中间件
//! - 端点参数与数据模型

pub mod config;
pub mod errors;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod response;
