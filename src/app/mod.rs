// ==========================================
// 食材库存消耗引擎 - 应用层
// ==========================================
// 职责: 组装连接、仓储、配置、编排器与API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
