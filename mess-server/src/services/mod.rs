//! 服务层
//!
//! # 服务列表
//!
//! - [`MealConfigService`] - 餐次时间 / 截止规则 / 菜单（含 TTL 缓存）
//! - [`RateGuard`] - 订餐滑动窗口限流

pub mod meal_config;
pub mod rate_guard;

pub use meal_config::{HostelMealConfig, MealConfigService};
pub use rate_guard::RateGuard;
