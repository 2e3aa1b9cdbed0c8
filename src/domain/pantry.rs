// ==========================================
// 食材库存消耗引擎 - 库存批次领域模型
// ==========================================
// 职责: PantryBatch(一个实物批次)与 IngredientNeed(菜谱一行需求)
// 红线: quantity >= 0; 批次只由消耗编排器扣减、撤销操作回补
// ==========================================

use crate::domain::types::BatchStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// PantryBatch - 库存批次
// ==========================================
// 对齐: pantry_batch 表
// revision: 乐观锁版本号,每次扣减/回补 +1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryBatch {
    // ===== 主键 =====
    pub batch_id: String,
    pub user_id: String,

    // ===== 食材信息 =====
    pub product_name: String,           // 录入/扫码得到的原始名称
    pub quantity: Decimal,              // 当前剩余量
    pub unit: String,                   // 单位(必须属于已知计量类别)
    pub expiration_date: Option<NaiveDate>, // 缺失视为永不过期,排在最后

    // ===== 状态 =====
    pub status: BatchStatus,
    pub revision: i64,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PantryBatch {
    /// 创建新的可用批次
    pub fn new(
        batch_id: impl Into<String>,
        user_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: Decimal,
        unit: impl Into<String>,
        expiration_date: Option<NaiveDate>,
    ) -> Self {
        let now = Utc::now();
        Self {
            batch_id: batch_id.into(),
            user_id: user_id.into(),
            product_name: product_name.into(),
            quantity,
            unit: unit.into(),
            expiration_date,
            status: BatchStatus::Available,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 设置创建时间(测试/导入回放用)
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    /// 是否可参与扣减
    pub fn is_available(&self) -> bool {
        self.status == BatchStatus::Available && self.quantity > Decimal::ZERO
    }

    /// 是否已过期(保质期当天仍可用)
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        matches!(self.expiration_date, Some(d) if d < today)
    }
}

// ==========================================
// IngredientNeed - 菜谱食材需求
// ==========================================
// 生命周期: 单次消耗请求内,不持久化
// required_quantity = None 表示"有多少用多少"(如:盐适量)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientNeed {
    pub ingredient_name: String,
    #[serde(default)]
    pub required_quantity: Option<Decimal>,
    pub required_unit: String,
}

impl IngredientNeed {
    pub fn new(
        ingredient_name: impl Into<String>,
        required_quantity: Option<Decimal>,
        required_unit: impl Into<String>,
    ) -> Self {
        Self {
            ingredient_name: ingredient_name.into(),
            required_quantity,
            required_unit: required_unit.into(),
        }
    }

    /// 按份数倍数缩放需求量
    ///
    /// # 返回
    /// - None: 缩放后数量超出 Decimal 表示范围
    pub fn scaled(&self, servings_multiplier: Decimal) -> Option<Self> {
        let required_quantity = match self.required_quantity {
            Some(q) => Some(q.checked_mul(servings_multiplier)?),
            None => None,
        };
        Some(Self {
            ingredient_name: self.ingredient_name.clone(),
            required_quantity,
            required_unit: self.required_unit.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_batch_expiry_boundary() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut batch = PantryBatch::new(
            "b1",
            "u1",
            "Milk",
            Decimal::from(1000),
            "ml",
            Some(today),
        );
        assert!(!batch.is_expired_on(today));

        batch.expiration_date = NaiveDate::from_ymd_opt(2026, 3, 9);
        assert!(batch.is_expired_on(today));

        batch.expiration_date = None;
        assert!(!batch.is_expired_on(today));
    }

    #[test]
    fn test_need_scaled_keeps_use_all() {
        let need = IngredientNeed::new("flour", Some(Decimal::from_str("250").unwrap()), "g");
        let doubled = need.scaled(Decimal::from(2)).unwrap();
        assert_eq!(doubled.required_quantity, Some(Decimal::from(500)));

        let salt = IngredientNeed::new("salt", None, "g");
        assert_eq!(salt.scaled(Decimal::from(3)).unwrap().required_quantity, None);
    }

    #[test]
    fn test_need_scaled_overflow() {
        let need = IngredientNeed::new("rice", Some(Decimal::MAX), "g");
        assert!(need.scaled(Decimal::from(2)).is_none());
        assert!(need.scaled(Decimal::ONE).is_some());
    }
}
