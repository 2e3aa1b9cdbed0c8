// ==========================================
// 食材库存消耗引擎 - 引擎层错误类型
// ==========================================
// 传播策略:
// - 单位错误/缺货/缺失: 按行收集,不中断整单
// - 并发修改/存储失败: 整单回滚
// - 撤销相关错误: 原样返回调用方
// ==========================================

use crate::domain::types::MeasurementCategory;
use crate::repository::error::RepositoryError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 单位换算错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("未知单位: {0}")]
    UnknownUnit(String),

    #[error("单位类别不兼容: {from}({from_category}) → {to}({to_category}),不支持跨类别换算")]
    IncompatibleUnits {
        from: String,
        to: String,
        from_category: MeasurementCategory,
        to_category: MeasurementCategory,
    },

    #[error("换算溢出: {amount} {from} → {to}")]
    Overflow {
        amount: String,
        from: String,
        to: String,
    },
}

/// 消耗编排错误
#[derive(Error, Debug)]
pub enum ConsumptionError {
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("并发修改: batch_id={batch_id}, expected_revision={expected}, actual_revision={actual}")]
    ConcurrentModification {
        batch_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("消耗记录不存在: record_id={0}")]
    RecordNotFound(String),

    #[error("消耗记录已撤销: record_id={0}")]
    AlreadyReverted(String),

    #[error("撤销窗口已过期: record_id={record_id}, revertible_until={revertible_until}")]
    RevertWindowExpired {
        record_id: String,
        revertible_until: DateTime<Utc>,
    },

    #[error("非法状态转换: ingredient={ingredient}, from={from} to={to}")]
    InvalidStateTransition {
        ingredient: String,
        from: String,
        to: String,
    },

    #[error("配置读取失败: {0}")]
    Config(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

// 乐观锁冲突 → 并发修改(整单回滚)
impl From<RepositoryError> for ConsumptionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                id,
                expected,
                actual,
                ..
            } => ConsumptionError::ConcurrentModification {
                batch_id: id,
                expected,
                actual,
            },
            other => ConsumptionError::Repository(other),
        }
    }
}

impl ConsumptionError {
    /// 是否为完整性错误(需要回滚整单)
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            ConsumptionError::ConcurrentModification { .. } | ConsumptionError::Repository(_)
        )
    }
}

/// Result 类型别名
pub type ConsumptionResult<T> = Result<T, ConsumptionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_lock_maps_to_concurrent_modification() {
        let err: ConsumptionError = RepositoryError::OptimisticLockFailure {
            entity: "PantryBatch".to_string(),
            id: "b1".to_string(),
            expected: 2,
            actual: 3,
        }
        .into();

        match err {
            ConsumptionError::ConcurrentModification {
                ref batch_id,
                expected,
                actual,
            } => {
                assert_eq!(batch_id, "b1");
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!ConsumptionError::RecordNotFound("r".into()).is_integrity_failure());
    }
}
