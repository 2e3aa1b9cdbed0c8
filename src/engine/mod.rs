// ==========================================
// 食材库存消耗引擎 - 引擎层
// ==========================================
// 职责: 单位换算、食材匹配、批次选择、消耗编排
// 红线: Engine 不拼 SQL, 库存读写只经由 PantryStore 事务作用域
// ==========================================

pub mod batch_picker;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod unit_table;

// 重导出核心引擎
pub use batch_picker::{fefo_order, BatchPicker, PickOptions};
pub use error::{ConsumptionError, ConsumptionResult, UnitError};
pub use matcher::{
    IngredientMatcher, MatchCandidate, MatchKind, MatchResult, MatchRule, SubstitutionTable,
    DEFAULT_MIN_SCORE,
};
pub use orchestrator::{ConsumptionOrchestrator, ConsumptionPreview, PreviewLine};
pub use unit_table::{normalize_unit, UnitDefinition, UnitTable};
