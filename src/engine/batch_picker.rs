// ==========================================
// 食材库存消耗引擎 - 批次选择器 (FEFO)
// ==========================================
// 职责: 对已匹配的批次池,按最早过期优先决定从哪些批次取、各取多少
// 输入: 候选批次 + 一行食材需求
// 输出: BatchSelection (只决策,不扣减,可用于预览)
// 红线: 无副作用; 单位不兼容的批次单独上报,不静默丢弃
// ==========================================

use crate::domain::consumption::{BatchSelection, ConversionFailure, SelectionLine};
use crate::domain::pantry::{IngredientNeed, PantryBatch};
use crate::domain::types::BatchStatus;
use crate::engine::unit_table::UnitTable;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

// ==========================================
// PickOptions - 选择参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickOptions {
    pub today: NaiveDate,
    /// 跳过已过期批次(自动消耗默认 true;需要查看过期库存时传 false)
    pub skip_expired: bool,
}

impl PickOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            skip_expired: true,
        }
    }

    pub fn include_expired(mut self) -> Self {
        self.skip_expired = false;
        self
    }
}

// ==========================================
// BatchPicker - FEFO 批次选择器
// ==========================================
pub struct BatchPicker {
    units: Arc<UnitTable>,
}

impl BatchPicker {
    /// 构造函数
    ///
    /// # 参数
    /// - units: 单位换算表
    pub fn new(units: Arc<UnitTable>) -> Self {
        Self { units }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 选择批次
    ///
    /// # 规则
    /// 1. 过滤 status != available 与数量为 0 的批次; skip_expired 时过滤已过期批次
    /// 2. 按 expiration_date 升序,无保质期排最后,同日按 batch_id 升序
    /// 3. 批次数量换算为需求单位; 不兼容的记入 conversion_failures
    /// 4. 依次贪心取 min(剩余需求, 批次可用量)
    /// 5. required_quantity 缺失时取尽所有可用批次,视为满足
    /// 6. shortfall = max(0, required - fulfilled)
    pub fn select(
        &self,
        pool: &[PantryBatch],
        need: &IngredientNeed,
        options: &PickOptions,
    ) -> BatchSelection {
        let mut selection = BatchSelection::empty(
            &need.ingredient_name,
            need.required_quantity,
            &need.required_unit,
        );

        // 步骤1: 过滤
        let mut eligible: Vec<&PantryBatch> = pool
            .iter()
            .filter(|b| b.status == BatchStatus::Available && b.quantity > Decimal::ZERO)
            .filter(|b| !(options.skip_expired && b.is_expired_on(options.today)))
            .collect();

        // 步骤2: FEFO 排序
        eligible.sort_by(|a, b| fefo_order(a, b));

        // 步骤3: 单位换算
        let mut convertible: Vec<(&PantryBatch, Decimal)> = Vec::with_capacity(eligible.len());
        for batch in eligible {
            match self
                .units
                .convert(batch.quantity, &batch.unit, &need.required_unit)
            {
                Ok(available) => convertible.push((batch, available)),
                Err(e) => {
                    warn!(
                        batch_id = %batch.batch_id,
                        from_unit = %batch.unit,
                        to_unit = %need.required_unit,
                        error = %e,
                        "批次单位无法换算,排除"
                    );
                    selection.conversion_failures.push(ConversionFailure {
                        batch_id: batch.batch_id.clone(),
                        product_name: batch.product_name.clone(),
                        from_unit: batch.unit.clone(),
                        to_unit: need.required_unit.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // 步骤4/5: 贪心取用
        let mut remaining = need.required_quantity.map(|q| q.max(Decimal::ZERO));
        let mut total = Decimal::ZERO;

        for (batch, available) in convertible {
            let take = match remaining {
                Some(r) if r <= Decimal::ZERO => break,
                Some(r) => r.min(available),
                None => available,
            };
            if take <= Decimal::ZERO {
                continue;
            }

            // 整批取尽时直接按库存原值扣减,避免换算往返留下尾差
            let debit_quantity = if take == available {
                batch.quantity
            } else {
                match self.units.convert(take, &need.required_unit, &batch.unit) {
                    Ok(q) => q.min(batch.quantity),
                    Err(e) => {
                        selection.conversion_failures.push(ConversionFailure {
                            batch_id: batch.batch_id.clone(),
                            product_name: batch.product_name.clone(),
                            from_unit: need.required_unit.clone(),
                            to_unit: batch.unit.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                }
            };

            selection.selections.push(SelectionLine {
                batch_id: batch.batch_id.clone(),
                product_name: batch.product_name.clone(),
                use_quantity: take,
                unit: need.required_unit.clone(),
                debit_quantity,
                debit_unit: batch.unit.clone(),
                expected_revision: batch.revision,
            });

            total += take;
            if let Some(r) = remaining.as_mut() {
                *r -= take;
            }
        }

        // 步骤6: 汇总
        selection.total_fulfilled = total;
        selection.shortfall = match need.required_quantity {
            Some(required) => (required.max(Decimal::ZERO) - total).max(Decimal::ZERO),
            None => Decimal::ZERO,
        };
        selection.is_fulfilled = selection.shortfall.is_zero();

        debug!(
            ingredient = %need.ingredient_name,
            batches = selection.selections.len(),
            total_fulfilled = %selection.total_fulfilled,
            shortfall = %selection.shortfall,
            "批次选择完成"
        );

        selection
    }
}

/// FEFO 排序键: 有保质期在前且升序,无保质期在后; 同日按 batch_id 升序
pub fn fefo_order(a: &PantryBatch, b: &PantryBatch) -> Ordering {
    match (a.expiration_date, b.expiration_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.batch_id.cmp(&b.batch_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn day(offset: i64) -> Option<NaiveDate> {
        Some(today() + chrono::Duration::days(offset))
    }

    fn batch(id: &str, name: &str, qty: &str, unit: &str, exp: Option<NaiveDate>) -> PantryBatch {
        PantryBatch::new(id, "u1", name, dec(qty), unit, exp)
    }

    fn picker() -> BatchPicker {
        BatchPicker::new(Arc::new(UnitTable::standard()))
    }

    // ==========================================
    // 正常案例
    // ==========================================

    #[test]
    fn test_single_batch_partial_draw() {
        // 200 g 意面,库存 453.592 g
        let pool = vec![batch("b1", "Spaghetti", "453.592", "g", day(30))];
        let need = IngredientNeed::new("pasta", Some(dec("200")), "g");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert!(sel.is_fulfilled);
        assert_eq!(sel.touched_batch_count(), 1);
        assert_eq!(sel.selections[0].use_quantity, dec("200"));
        assert_eq!(sel.selections[0].debit_quantity, dec("200"));
        assert_eq!(pool[0].quantity - sel.selections[0].debit_quantity, dec("253.592"));
    }

    #[test]
    fn test_split_across_batches_earliest_first() {
        let pool = vec![
            batch("penne", "Pasta (Penne)", "453.592", "g", day(60)),
            batch("spag", "Pasta (Spaghetti)", "453.592", "g", day(5)),
        ];
        let need = IngredientNeed::new("pasta", Some(dec("600")), "g");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert_eq!(sel.selections.len(), 2);
        assert_eq!(sel.selections[0].batch_id, "spag");
        assert_eq!(sel.selections[0].debit_quantity, dec("453.592"));
        assert_eq!(sel.selections[1].batch_id, "penne");
        assert_eq!(sel.selections[1].debit_quantity, dec("146.408"));
        assert_eq!(sel.total_fulfilled, dec("600"));
        assert_eq!(sel.shortfall, Decimal::ZERO);
        assert_eq!(dec("453.592") - sel.selections[1].debit_quantity, dec("307.184"));
    }

    #[test]
    fn test_shortfall_when_stock_runs_out() {
        let pool = vec![batch("f1", "Flour", "907.185", "g", None)];
        let need = IngredientNeed::new("flour", Some(dec("1000")), "g");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert!(!sel.is_fulfilled);
        assert_eq!(sel.total_fulfilled, dec("907.185"));
        assert_eq!(sel.shortfall, dec("92.815"));
        assert_eq!(sel.total_fulfilled + sel.shortfall, dec("1000"));
    }

    #[test]
    fn test_unit_conversion_cup_to_ml() {
        let pool = vec![batch("m1", "Milk (Whole)", "1892.71", "ml", day(3))];
        let need = IngredientNeed::new("milk", Some(dec("1")), "cup");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert!(sel.is_fulfilled);
        assert_eq!(sel.selections[0].use_quantity, Decimal::ONE);
        assert_eq!(sel.selections[0].debit_unit, "ml");
        assert_eq!(sel.selections[0].debit_quantity, dec("236.5882365"));
    }

    #[test]
    fn test_use_all_when_quantity_absent() {
        let pool = vec![
            batch("s2", "Salt", "100", "g", None),
            batch("s1", "Salt", "0.5", "kg", day(400)),
        ];
        let need = IngredientNeed::new("salt", None, "g");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert!(sel.is_fulfilled);
        assert_eq!(sel.shortfall, Decimal::ZERO);
        assert_eq!(sel.total_fulfilled, dec("600"));
        assert_eq!(sel.selections[0].batch_id, "s1");
        assert_eq!(sel.selections[0].debit_quantity, dec("0.5"));
        assert_eq!(sel.selections[1].debit_quantity, dec("100"));
    }

    // ==========================================
    // 过滤与排序
    // ==========================================

    #[test]
    fn test_expired_skipped_by_default_visible_on_request() {
        let pool = vec![
            batch("old", "Eggs", "6", "each", day(-2)),
            batch("new", "Eggs", "6", "each", day(10)),
        ];
        let need = IngredientNeed::new("eggs", Some(dec("2")), "each");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert_eq!(sel.selections[0].batch_id, "new");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()).include_expired());
        assert_eq!(sel.selections[0].batch_id, "old");
    }

    #[test]
    fn test_non_available_status_filtered() {
        let mut consumed = batch("c", "Butter", "100", "g", day(1));
        consumed.status = BatchStatus::Consumed;
        let mut expired = batch("e", "Butter", "100", "g", day(2));
        expired.status = BatchStatus::Expired;
        let ok = batch("ok", "Butter", "100", "g", day(3));

        let need = IngredientNeed::new("butter", Some(dec("50")), "g");
        let sel = picker().select(&[consumed, expired, ok], &need, &PickOptions::new(today()));
        assert_eq!(sel.selections.len(), 1);
        assert_eq!(sel.selections[0].batch_id, "ok");
    }

    #[test]
    fn test_same_expiration_tie_break_by_batch_id() {
        let pool = vec![
            batch("b3", "Rice", "100", "g", day(5)),
            batch("b1", "Rice", "100", "g", day(5)),
            batch("b2", "Rice", "100", "g", None),
        ];
        let need = IngredientNeed::new("rice", Some(dec("250")), "g");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        let order: Vec<&str> = sel.selections.iter().map(|s| s.batch_id.as_str()).collect();
        assert_eq!(order, vec!["b1", "b3", "b2"]);
        assert_eq!(sel.selections[2].use_quantity, dec("50"));
    }

    #[test]
    fn test_fefo_never_skips_earlier_batch_with_stock() {
        // 每个非首个被取用的批次,之前的批次都必须被取尽
        let pool = vec![
            batch("a", "Oats", "120", "g", day(9)),
            batch("b", "Oats", "80", "g", day(2)),
            batch("c", "Oats", "200", "g", day(4)),
            batch("d", "Oats", "50", "g", None),
        ];
        for required in ["10", "80", "81", "280", "399", "450", "500"] {
            let need = IngredientNeed::new("oats", Some(dec(required)), "g");
            let sel = picker().select(&pool, &need, &PickOptions::new(today()));

            let mut sorted: Vec<&PantryBatch> = pool.iter().collect();
            sorted.sort_by(|a, b| fefo_order(a, b));
            for (i, line) in sel.selections.iter().enumerate() {
                assert_eq!(line.batch_id, sorted[i].batch_id);
                if i + 1 < sel.selections.len() {
                    assert_eq!(line.debit_quantity, sorted[i].quantity);
                }
            }
            assert_eq!(sel.total_fulfilled + sel.shortfall, dec(required));
        }
    }

    #[test]
    fn test_incompatible_batch_reported_not_dropped() {
        let pool = vec![
            batch("w", "Milk Powder", "500", "g", day(1)),
            batch("v", "Milk", "1000", "ml", day(2)),
        ];
        let need = IngredientNeed::new("milk", Some(dec("250")), "ml");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert!(sel.is_fulfilled);
        assert_eq!(sel.selections.len(), 1);
        assert_eq!(sel.selections[0].batch_id, "v");
        assert_eq!(sel.conversion_failures.len(), 1);
        assert_eq!(sel.conversion_failures[0].batch_id, "w");
    }

    #[test]
    fn test_unknown_need_unit_yields_full_shortfall() {
        let pool = vec![batch("v", "Milk", "1000", "ml", day(2))];
        let need = IngredientNeed::new("milk", Some(dec("2")), "splash");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert!(!sel.is_fulfilled);
        assert_eq!(sel.shortfall, dec("2"));
        assert_eq!(sel.conversion_failures.len(), 1);
    }

    #[test]
    fn test_zero_requirement_is_trivially_fulfilled() {
        let pool = vec![batch("v", "Milk", "1000", "ml", day(2))];
        let need = IngredientNeed::new("milk", Some(Decimal::ZERO), "ml");

        let sel = picker().select(&pool, &need, &PickOptions::new(today()));
        assert!(sel.is_fulfilled);
        assert!(sel.selections.is_empty());
    }
}
