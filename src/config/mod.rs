// ==========================================
// 食材库存消耗引擎 - 配置层
// ==========================================
// 职责: 系统配置管理,支持全局覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod consumption_config_trait;
pub mod consumption_settings;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, ConfigManager, DEFAULT_REVERT_WINDOW_MINUTES, MAX_REVERT_WINDOW_MINUTES,
};
pub use consumption_config_trait::{ConfigResult, ConsumptionConfigReader};
pub use consumption_settings::ConsumptionSettings;
