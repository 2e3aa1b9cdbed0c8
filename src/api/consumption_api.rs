// ==========================================
// 食材库存消耗引擎 - 菜谱完成 API
// ==========================================
// 职责: JSON 友好的请求/响应封装,错误转换为 ApiError
// ==========================================

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::consumption::{ConsumptionRecord, ConsumptionReport};
use crate::domain::pantry::IngredientNeed;
use crate::engine::{ConsumptionOrchestrator, ConsumptionPreview};
use crate::repository::{ConsumptionRecordRepository, SqlitePantryStore};

/// 默认历史查询条数
const DEFAULT_HISTORY_LIMIT: usize = 50;

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

// ==========================================
// 请求/响应
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteRecipeRequest {
    pub recipe_id: String,
    pub user_id: String,
    pub ingredient_needs: Vec<IngredientNeed>,
    #[serde(default = "default_multiplier")]
    pub servings_multiplier: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertResponse {
    pub reverted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ==========================================
// ConsumptionApi
// ==========================================
pub struct ConsumptionApi {
    orchestrator: Arc<ConsumptionOrchestrator<SqlitePantryStore, ConfigManager>>,
    record_repo: Arc<ConsumptionRecordRepository>,
}

impl ConsumptionApi {
    pub fn new(
        orchestrator: Arc<ConsumptionOrchestrator<SqlitePantryStore, ConfigManager>>,
        record_repo: Arc<ConsumptionRecordRepository>,
    ) -> Self {
        Self {
            orchestrator,
            record_repo,
        }
    }

    /// 完成菜谱并扣减库存
    ///
    /// # 返回
    /// - Ok(ConsumptionReport): 含缺失/缺口明细(普通缺货不是错误)
    /// - Err(ApiError): 输入无效、并发冲突(已整单回滚)、存储失败
    pub async fn complete_recipe(&self, request: &CompleteRecipeRequest) -> ApiResult<ConsumptionReport> {
        Ok(self
            .orchestrator
            .consume(
                &request.recipe_id,
                &request.user_id,
                &request.ingredient_needs,
                request.servings_multiplier,
            )
            .await?)
    }

    /// 试算,不修改库存
    pub async fn preview_recipe(&self, request: &CompleteRecipeRequest) -> ApiResult<ConsumptionPreview> {
        Ok(self
            .orchestrator
            .preview(
                &request.user_id,
                &request.ingredient_needs,
                request.servings_multiplier,
            )
            .await?)
    }

    /// 撤销消耗
    ///
    /// 撤销失败不抛错,以 reverted=false + reason 返回
    pub async fn revert(&self, record_id: &str, user_id: &str) -> RevertResponse {
        match self.orchestrator.revert(record_id, user_id).await {
            Ok(_) => RevertResponse {
                reverted: true,
                reason: None,
            },
            Err(e) => {
                warn!(record_id, error = %e, "撤销未执行");
                RevertResponse {
                    reverted: false,
                    reason: Some(e.to_string()),
                }
            }
        }
    }

    /// 用户消耗历史(新 → 旧)
    pub fn list_history(&self, user_id: &str, limit: Option<usize>) -> ApiResult<Vec<ConsumptionRecord>> {
        if user_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("user_id 不能为空".to_string()));
        }
        Ok(self
            .record_repo
            .list_by_user(user_id, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_multiplier() {
        let json = r#"{
            "recipe_id": "r1",
            "user_id": "u1",
            "ingredient_needs": [
                {"ingredient_name": "milk", "required_quantity": "1", "required_unit": "cup"},
                {"ingredient_name": "salt", "required_unit": ""}
            ]
        }"#;
        let req: CompleteRecipeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.servings_multiplier, Decimal::ONE);
        assert_eq!(req.ingredient_needs[0].required_quantity, Some(Decimal::ONE));
        assert_eq!(req.ingredient_needs[1].required_quantity, None);
    }

    #[test]
    fn test_revert_response_omits_empty_reason() {
        let ok = RevertResponse {
            reverted: true,
            reason: None,
        };
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"reverted":true}"#);
    }
}
