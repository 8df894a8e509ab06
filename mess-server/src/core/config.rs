use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;

/// 服务器配置 - 订餐服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/mess | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | DATABASE_PATH | {WORK_DIR}/mess.db | SQLite 文件 |
/// | ENVIRONMENT | development | 运行环境 |
/// | TIMEZONE | Asia/Kolkata | 宿舍所在时区 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | {WORK_DIR}/logs | 日志目录 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | BOOKING_RATE_LIMIT | 3 | 窗口内最多变更次数 |
/// | BOOKING_RATE_WINDOW_SECS | 60 | 限流窗口(秒) |
/// | RATE_SWEEP_INTERVAL_SECS | 60 | 限流清理周期(秒) |
/// | CONFIG_CACHE_TTL_SECS | 300 | 餐次配置缓存 TTL(秒) |
/// | MAX_BULK_ENTRIES | 10 | 单次请求最多天数 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/mess HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// SQLite 数据库路径
    pub database_path: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// Cutoff instants and "today" are computed in this zone
    pub timezone: Tz,
    pub log_level: String,
    pub log_dir: String,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,

    // === 订餐规则 ===
    pub booking_rate_limit: usize,
    pub booking_rate_window_secs: u64,
    pub rate_sweep_interval_secs: u64,
    pub config_cache_ttl_secs: u64,
    pub max_bulk_entries: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/mess".into());
        let database_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| {
            PathBuf::from(&work_dir)
                .join("mess.db")
                .to_string_lossy()
                .into_owned()
        });
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| {
            PathBuf::from(&work_dir)
                .join("logs")
                .to_string_lossy()
                .into_owned()
        });
        let timezone = match std::env::var("TIMEZONE") {
            Ok(name) => name.parse::<Tz>().unwrap_or_else(|_| {
                tracing::warn!(timezone = %name, "Unknown TIMEZONE, falling back to Asia/Kolkata");
                chrono_tz::Asia::Kolkata
            }),
            Err(_) => chrono_tz::Asia::Kolkata,
        };

        Self {
            http_port: env_or("HTTP_PORT", 3000),
            database_path,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir,
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30_000),
            booking_rate_limit: env_or("BOOKING_RATE_LIMIT", 3),
            booking_rate_window_secs: env_or("BOOKING_RATE_WINDOW_SECS", 60),
            rate_sweep_interval_secs: env_or("RATE_SWEEP_INTERVAL_SECS", 60),
            config_cache_ttl_secs: env_or("CONFIG_CACHE_TTL_SECS", 300),
            max_bulk_entries: env_or("MAX_BULK_ENTRIES", 10),
            work_dir,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.booking_rate_window_secs)
    }

    pub fn rate_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_sweep_interval_secs.max(1))
    }

    pub fn config_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config_cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
