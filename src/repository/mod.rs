// ==========================================
// 食材库存消耗引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod consumption_record_repo;
pub mod error;
pub mod pantry_batch_repo;
pub mod pantry_store;

// 重导出核心仓储
pub use consumption_record_repo::ConsumptionRecordRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use pantry_batch_repo::PantryBatchRepository;
pub use pantry_store::{PantryStore, PantryTransaction, SqlitePantryStore};
