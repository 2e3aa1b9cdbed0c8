// ==========================================
// 食材库存消耗引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod consumption;
pub mod pantry;
pub mod types;

// 重导出核心类型
pub use consumption::{
    round_for_display, BatchSelection, ConsumedBatch, ConsumptionRecord, ConsumptionReport,
    ConversionFailure, RecordDebit, RecordLineItem, ReportLine, RevertOutcome, SelectionLine,
};
pub use pantry::{IngredientNeed, PantryBatch};
pub use types::{
    BatchStatus, ConsumptionOutcome, IngredientState, LineStatus, MeasurementCategory,
    RecordStatus,
};
