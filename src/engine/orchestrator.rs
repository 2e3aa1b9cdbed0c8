// ==========================================
// 食材库存消耗引擎 - 消耗编排器
// ==========================================
// 职责: 驱动一次"完成菜谱"操作: 匹配 → 换算 → 选批 → 扣减 → 记录
// 红线:
// - 整单扣减在单个存储事务内完成,全部生效或全部回滚
// - 缺失/缺口/单位问题按行收集,不中断整单
// - 撤销按记录精确回补,不重新匹配
// ==========================================

mod core;
mod revert;

pub use core::{ConsumptionOrchestrator, ConsumptionPreview, PreviewLine};
