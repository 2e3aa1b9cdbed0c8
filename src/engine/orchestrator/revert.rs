use super::core::ConsumptionOrchestrator;
use crate::config::ConsumptionConfigReader;
use crate::domain::consumption::{ConsumedBatch, RevertOutcome};
use crate::domain::types::RecordStatus;
use crate::engine::error::{ConsumptionError, ConsumptionResult};
use crate::repository::pantry_store::PantryStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

impl<S, C> ConsumptionOrchestrator<S, C>
where
    S: PantryStore,
    C: ConsumptionConfigReader,
{
    /// 撤销一次消耗
    pub async fn revert(&self, record_id: &str, user_id: &str) -> ConsumptionResult<RevertOutcome> {
        self.revert_at(record_id, user_id, Utc::now()).await
    }

    /// 以指定时刻撤销
    ///
    /// # 规则
    /// 1. 记录不存在或不属于该用户 → RecordNotFound
    /// 2. 已撤销 → AlreadyReverted
    /// 3. now > revertible_until → RevertWindowExpired
    /// 4. 按记录中的 batch_id + 数量(批次单位)逐笔回补,不重新匹配
    /// 5. 标记记录为 reverted; 以上在同一事务内完成
    pub async fn revert_at(
        &self,
        record_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ConsumptionResult<RevertOutcome> {
        info!(record_id, user_id, "开始撤销消耗记录");

        let result = self
            .store
            .in_transaction(|tx| -> ConsumptionResult<RevertOutcome> {
                let record = tx
                    .find_record(record_id)?
                    .filter(|r| r.user_id == user_id)
                    .ok_or_else(|| ConsumptionError::RecordNotFound(record_id.to_string()))?;

                if record.status == RecordStatus::Reverted {
                    return Err(ConsumptionError::AlreadyReverted(record.record_id));
                }
                if !record.is_revertible_at(now) {
                    return Err(ConsumptionError::RevertWindowExpired {
                        record_id: record.record_id,
                        revertible_until: record.revertible_until,
                    });
                }

                let mut restored = Vec::new();
                for debit in record.all_debits() {
                    let batch = tx.credit_batch(&debit.batch_id, debit.quantity)?;
                    debug!(
                        batch_id = %debit.batch_id,
                        credited = %debit.quantity,
                        quantity_after = %batch.quantity,
                        status = %batch.status,
                        "批次回补"
                    );
                    restored.push(ConsumedBatch {
                        batch_id: debit.batch_id.clone(),
                        product_name: debit.product_name.clone(),
                        quantity: debit.quantity,
                        unit: debit.unit.clone(),
                    });
                }

                tx.mark_record_reverted(&record.record_id, now)?;

                Ok(RevertOutcome {
                    record_id: record.record_id.clone(),
                    reverted_at: now,
                    restored_batches: restored,
                })
            });

        match &result {
            Ok(outcome) => info!(
                record_id,
                restored = outcome.restored_batches.len(),
                "消耗记录已撤销"
            ),
            Err(e) => warn!(record_id, error = %e, "撤销失败"),
        }
        result
    }
}
