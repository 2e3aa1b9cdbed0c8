// ==========================================
// 食材库存消耗引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 菜谱完成时按匹配/换算/先到期先出扣减库存,可撤销
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    BatchStatus, ConsumptionOutcome, IngredientState, LineStatus, MeasurementCategory,
    RecordStatus,
};

// 领域实体
pub use domain::{
    ConsumptionRecord, ConsumptionReport, IngredientNeed, PantryBatch, RevertOutcome,
};

// 引擎
pub use engine::{
    BatchPicker, ConsumptionError, ConsumptionOrchestrator, IngredientMatcher, UnitError,
    UnitTable,
};

// API
pub use api::{ApiError, CompleteRecipeRequest, ConsumptionApi, RevertResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "食材库存消耗引擎";
