// ==========================================
// 食材库存消耗引擎 - 消耗配置读取 Trait
// ==========================================
// 职责: 定义消耗编排所需的配置读取接口(不包含实现)
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ConsumptionConfigReader Trait
// ==========================================
// 实现者: ConfigManager(从 config_kv 表读取)
#[async_trait]
pub trait ConsumptionConfigReader: Send + Sync {
    /// 匹配最低分数
    ///
    /// # 默认值
    /// - 60
    async fn get_match_min_score(&self) -> ConfigResult<u8>;

    /// 撤销窗口(分钟)
    ///
    /// # 默认值
    /// - 1440(24 小时)
    async fn get_revert_window_minutes(&self) -> ConfigResult<i64>;

    /// 自动消耗是否跳过过期批次
    ///
    /// # 默认值
    /// - true
    async fn get_skip_expired(&self) -> ConfigResult<bool>;

    /// 附加替换对(与内置替换表合并)
    ///
    /// # 格式
    /// JSON: [["scallion", "green onion"], ["rocket", "arugula"]]
    ///
    /// # 默认值
    /// - []
    async fn get_substitution_pairs(&self) -> ConfigResult<Vec<(String, String)>>;
}
