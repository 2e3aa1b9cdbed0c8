// ==========================================
// 食材库存消耗引擎 - 消耗领域模型
// ==========================================
// 职责: 批次选择结果、可撤销消耗记录、对外消耗报告
// 红线: 消耗记录是追加式事务日志,撤销按记录精确回补,不重新推导
// ==========================================

use crate::domain::types::{ConsumptionOutcome, LineStatus, RecordStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 对外展示统一保留 2 位小数(内部扣减保持全精度)
pub const DISPLAY_SCALE: u32 = 2;

/// 展示用取整
pub fn round_for_display(value: Decimal) -> Decimal {
    value.round_dp(DISPLAY_SCALE).normalize()
}

// ==========================================
// SelectionLine - 单个批次的取用
// ==========================================
// use_quantity/unit: 按需求单位计
// debit_quantity/debit_unit: 按批次自身单位计,实际扣减用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionLine {
    pub batch_id: String,
    pub product_name: String,
    pub use_quantity: Decimal,
    pub unit: String,
    pub debit_quantity: Decimal,
    pub debit_unit: String,
    pub expected_revision: i64,
}

// ==========================================
// ConversionFailure - 单位不兼容的批次
// ==========================================
// 不可静默丢弃,随结果一并上报
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionFailure {
    pub batch_id: String,
    pub product_name: String,
    pub from_unit: String,
    pub to_unit: String,
    pub reason: String,
}

// ==========================================
// BatchSelection - 批次选择器输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSelection {
    pub ingredient_name: String,
    pub required_quantity: Option<Decimal>,
    pub required_unit: String,
    pub selections: Vec<SelectionLine>, // 按取用顺序(最早过期优先)
    pub total_fulfilled: Decimal,
    pub shortfall: Decimal,
    pub is_fulfilled: bool,
    pub conversion_failures: Vec<ConversionFailure>,
}

impl BatchSelection {
    /// 空选择(无候选批次)
    pub fn empty(ingredient_name: &str, required_quantity: Option<Decimal>, required_unit: &str) -> Self {
        let shortfall = required_quantity
            .map(|q| q.max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO);
        Self {
            ingredient_name: ingredient_name.to_string(),
            required_quantity,
            required_unit: required_unit.to_string(),
            selections: vec![],
            total_fulfilled: Decimal::ZERO,
            shortfall,
            is_fulfilled: shortfall.is_zero(),
            conversion_failures: vec![],
        }
    }

    pub fn touched_batch_count(&self) -> usize {
        self.selections.len()
    }
}

// ==========================================
// RecordDebit - 记录中的单笔扣减
// ==========================================
// 撤销时按 batch_id + quantity(批次单位) 精确回补
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDebit {
    pub batch_id: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub quantity_before: Decimal,
    pub status_consumed: bool, // 本次扣减是否使批次归零
}

// ==========================================
// RecordLineItem - 记录中的单行食材
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordLineItem {
    pub ingredient_name: String,
    pub status: LineStatus,
    pub required_quantity: Option<Decimal>,
    pub required_unit: String,
    pub debits: Vec<RecordDebit>,
    pub shortfall: Decimal,
}

// ==========================================
// ConsumptionRecord - 可撤销消耗记录
// ==========================================
// 对齐: consumption_record 表(line_items 以 JSON 存储)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub record_id: String,
    pub recipe_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub revertible_until: DateTime<Utc>,
    pub status: RecordStatus,
    pub reverted_at: Option<DateTime<Utc>>,
    pub line_items: Vec<RecordLineItem>,
}

impl ConsumptionRecord {
    /// 记录涉及的全部扣减(按写入顺序)
    pub fn all_debits(&self) -> impl Iterator<Item = &RecordDebit> {
        self.line_items.iter().flat_map(|l| l.debits.iter())
    }

    pub fn is_revertible_at(&self, now: DateTime<Utc>) -> bool {
        self.status == RecordStatus::Active && now <= self.revertible_until
    }
}

// ==========================================
// ConsumptionReport - 对外消耗报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedBatch {
    pub batch_id: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLine {
    pub ingredient_name: String,
    pub status: LineStatus,
    pub matched_products: Vec<String>,
    pub match_score: Option<u8>,
    pub consumed: Vec<ConsumedBatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall_unit: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub conversion_failures: Vec<ConversionFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionReport {
    pub recipe_id: String,
    pub outcome: ConsumptionOutcome,
    pub per_ingredient: Vec<ReportLine>,
    pub record_id: Option<String>,
    pub revertible_until: Option<DateTime<Utc>>,
}

impl ConsumptionReport {
    /// 缺失食材名称列表
    pub fn missing_ingredients(&self) -> Vec<&str> {
        self.per_ingredient
            .iter()
            .filter(|l| l.status == LineStatus::Missing)
            .map(|l| l.ingredient_name.as_str())
            .collect()
    }

    /// 有缺口的食材行
    pub fn shortfalls(&self) -> Vec<&ReportLine> {
        self.per_ingredient
            .iter()
            .filter(|l| l.status == LineStatus::Insufficient)
            .collect()
    }
}

// ==========================================
// RevertOutcome - 撤销结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertOutcome {
    pub record_id: String,
    pub reverted_at: DateTime<Utc>,
    pub restored_batches: Vec<ConsumedBatch>,
}
