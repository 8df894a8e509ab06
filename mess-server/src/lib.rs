//! Mess Server - 宿舍食堂订餐与截止时间引擎
//!
//! # 架构概述
//!
//! - **订餐** (`booking`): 截止时间策略、状态派生、按餐次的写入规划
//! - **报表** (`reports`): 学生月历、当日看板、外出单关联
//! - **配置** (`services`): 餐次时间 / 截止时间缓存、订餐限流
//! - **身份** (`auth`): 网关转发的调用方身份与宿舍范围校验
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! mess-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── auth/          # 调用方身份
//! ├── booking/       # 订餐规则与写入
//! ├── reports/       # 只读视图
//! ├── services/      # 配置缓存、限流
//! ├── api/           # HTTP 路由和处理器
//! ├── utils/         # 工具函数
//! └── db/            # 数据库层
//! ```

pub mod api;
pub mod auth;
pub mod booking;
pub mod core;
pub mod db;
pub mod reports;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{Actor, Role};
pub use booking::BookingService;
pub use core::{BackgroundTasks, Config, Server, ServerState};
pub use reports::ReportService;
pub use services::{MealConfigService, RateGuard};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Audit logging macro - 截止时间绕过、撤销等管理操作
#[macro_export]
macro_rules! audit_log {
    ($event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "audit",
            event = $event,
            $($key = $value),*
        );
    };
}

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境
///
/// 1. 加载 `.env` (可选)
/// 2. 创建工作目录和日志目录
/// 3. 初始化日志
pub fn setup_environment() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    std::fs::create_dir_all(&config.log_dir)?;

    init_logger_with_file(Some(&config.log_level), Some(&config.log_dir));
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    __  ___
   /  |/  /__  __________
  / /|_/ / _ \/ ___/ ___/
 / /  / /  __(__  |__  )
/_/  /_/\___/____/____/
    "#
    );
}
