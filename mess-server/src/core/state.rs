use std::sync::Arc;

use sqlx::SqlitePool;

use crate::booking::BookingService;
use crate::core::Config;
use crate::core::tasks::BackgroundTasks;
use crate::db::DbService;
use crate::reports::ReportService;
use crate::services::{MealConfigService, RateGuard};
use crate::utils::{AppError, SharedClock, SystemClock};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有字段都是浅拷贝 (pool / Arc)，可以直接作为 axum state 克隆。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | clock | SharedClock | 时钟 (测试中可替换) |
/// | meal_config | MealConfigService | 餐次配置 + 缓存 |
/// | bookings | BookingService | 订餐写入 |
/// | reports | ReportService | 日历 / 看板 / 报表 |
/// | rate_guard | RateGuard | 订餐限流 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub clock: SharedClock,
    pub meal_config: MealConfigService,
    pub bookings: BookingService,
    pub reports: ReportService,
    pub rate_guard: RateGuard,
}

impl ServerState {
    /// 由已打开的连接池组装所有服务
    pub fn with_pool(config: Config, pool: SqlitePool, clock: SharedClock) -> Self {
        let meal_config =
            MealConfigService::new(pool.clone(), clock.clone(), config.config_cache_ttl());
        let bookings = BookingService::new(
            pool.clone(),
            meal_config.clone(),
            clock.clone(),
            config.timezone,
            config.max_bulk_entries,
        );
        let reports = ReportService::new(
            pool.clone(),
            meal_config.clone(),
            clock.clone(),
            config.timezone,
        );
        let rate_guard = RateGuard::new(
            config.booking_rate_limit,
            config.rate_window(),
            clock.clone(),
        );

        Self {
            config,
            pool,
            clock,
            meal_config,
            bookings,
            reports,
            rate_guard,
        }
    }

    /// 初始化服务器状态
    ///
    /// 1. 工作目录
    /// 2. 数据库 (WAL + migrations)
    /// 3. 各服务
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            AppError::internal(format!(
                "Failed to create work directory {}: {e}",
                config.work_dir
            ))
        })?;

        let db = DbService::new(&config.database_path).await?;
        tracing::info!(
            path = %config.database_path,
            timezone = %config.timezone,
            "Server state initialized"
        );
        Ok(Self::with_pool(
            config.clone(),
            db.pool,
            Arc::new(SystemClock),
        ))
    }

    /// 启动后台任务
    ///
    /// - 限流清理 (Periodic)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();
        self.rate_guard
            .spawn_sweeper(&mut tasks, self.config.rate_sweep_interval());
        tasks.log_summary();
        tasks
    }
}
