// ==========================================
// 食材库存消耗引擎 - 领域类型定义
// ==========================================
// 职责: 批次状态、消耗结果、计量类别等枚举
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
// 红线: 数量归零的批次标记为 consumed,不删除(撤销依赖它)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Available, // 可用
    Consumed,  // 已耗尽
    Expired,   // 已过期(人工/入库侧标记)
}

impl BatchStatus {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Available => "available",
            BatchStatus::Consumed => "consumed",
            BatchStatus::Expired => "expired",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Some(BatchStatus::Available),
            "consumed" => Some(BatchStatus::Consumed),
            "expired" => Some(BatchStatus::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 计量类别 (Measurement Category)
// ==========================================
// 红线: 只允许类别内换算,重量↔体积需要密度,不支持
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementCategory {
    Weight, // 基准单位 g
    Volume, // 基准单位 ml
    Count,  // 基准单位 each
}

impl fmt::Display for MeasurementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementCategory::Weight => write!(f, "weight"),
            MeasurementCategory::Volume => write!(f, "volume"),
            MeasurementCategory::Count => write!(f, "count"),
        }
    }
}

// ==========================================
// 单行食材结果 (Line Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Fulfilled,    // 足量扣减
    Insufficient, // 已尽力扣减,仍有缺口
    Missing,      // 库存中无匹配食材
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineStatus::Fulfilled => write!(f, "fulfilled"),
            LineStatus::Insufficient => write!(f, "insufficient"),
            LineStatus::Missing => write!(f, "missing"),
        }
    }
}

// ==========================================
// 单行食材状态机 (Ingredient State)
// ==========================================
// pending → matched → converted → selected → debited
// pending → missing
// matched/converted/selected → insufficient(缺口仍扣减已找到部分)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientState {
    Pending,
    Matched,
    Converted,
    Selected,
    Debited,
    Missing,
    Insufficient,
}

impl IngredientState {
    /// 判断状态转换是否合法
    pub fn can_transition_to(&self, next: IngredientState) -> bool {
        use IngredientState::*;
        matches!(
            (self, next),
            (Pending, Matched)
                | (Pending, Missing)
                | (Matched, Converted)
                | (Matched, Insufficient)
                | (Converted, Selected)
                | (Converted, Insufficient)
                | (Selected, Debited)
                | (Selected, Insufficient)
        )
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IngredientState::Debited | IngredientState::Missing | IngredientState::Insufficient
        )
    }
}

impl fmt::Display for IngredientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IngredientState::Pending => "pending",
            IngredientState::Matched => "matched",
            IngredientState::Converted => "converted",
            IngredientState::Selected => "selected",
            IngredientState::Debited => "debited",
            IngredientState::Missing => "missing",
            IngredientState::Insufficient => "insufficient",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// 整单结果 (Consumption Outcome)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionOutcome {
    Cooked,             // 全部足量
    CookedWithWarnings, // 有缺口/缺失,但已扣减可扣部分
    NotCooked,          // 一样都没扣到
}

impl fmt::Display for ConsumptionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumptionOutcome::Cooked => write!(f, "cooked"),
            ConsumptionOutcome::CookedWithWarnings => write!(f, "cooked_with_warnings"),
            ConsumptionOutcome::NotCooked => write!(f, "not_cooked"),
        }
    }
}

// ==========================================
// 消耗记录状态 (Record Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Active,   // 可撤销(窗口内)
    Reverted, // 已撤销
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Reverted => "reverted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(RecordStatus::Active),
            "reverted" => Some(RecordStatus::Reverted),
            _ => None,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_roundtrip_str() {
        for status in [BatchStatus::Available, BatchStatus::Consumed, BatchStatus::Expired] {
            assert_eq!(BatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BatchStatus::parse(" Available "), Some(BatchStatus::Available));
        assert_eq!(BatchStatus::parse("gone"), None);
    }

    #[test]
    fn test_ingredient_state_transitions() {
        use IngredientState::*;
        assert!(Pending.can_transition_to(Matched));
        assert!(Pending.can_transition_to(Missing));
        assert!(Selected.can_transition_to(Debited));
        assert!(Matched.can_transition_to(Insufficient));

        // 不允许跳步或离开终态
        assert!(!Pending.can_transition_to(Debited));
        assert!(!Missing.can_transition_to(Matched));
        assert!(!Debited.can_transition_to(Insufficient));
        assert!(Debited.is_terminal());
        assert!(!Converted.is_terminal());
    }
}
