use crate::config::{ConsumptionConfigReader, ConsumptionSettings};
use crate::domain::consumption::{
    round_for_display, BatchSelection, ConsumedBatch, ConsumptionRecord, ConsumptionReport,
    RecordDebit, RecordLineItem, ReportLine, SelectionLine,
};
use crate::domain::pantry::{IngredientNeed, PantryBatch};
use crate::domain::types::{
    BatchStatus, ConsumptionOutcome, IngredientState, LineStatus, RecordStatus,
};
use crate::engine::batch_picker::{fefo_order, BatchPicker, PickOptions};
use crate::engine::error::{ConsumptionError, ConsumptionResult};
use crate::engine::matcher::{IngredientMatcher, MatchResult};
use crate::engine::unit_table::UnitTable;
use crate::repository::error::RepositoryError;
use crate::repository::pantry_store::PantryStore;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// 预览结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewLine {
    pub ingredient_name: String,
    pub status: LineStatus,
    pub match_result: Option<MatchResult>,
    pub selection: BatchSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionPreview {
    pub outcome: ConsumptionOutcome,
    pub per_ingredient: Vec<PreviewLine>,
}

// ==========================================
// ConsumptionOrchestrator - 消耗编排器
// ==========================================
pub struct ConsumptionOrchestrator<S, C>
where
    S: PantryStore,
    C: ConsumptionConfigReader,
{
    pub(super) store: Arc<S>,
    pub(super) config: Arc<C>,
    pub(super) units: Arc<UnitTable>,
}

impl<S, C> ConsumptionOrchestrator<S, C>
where
    S: PantryStore,
    C: ConsumptionConfigReader,
{
    /// 创建新的编排器实例
    ///
    /// # 参数
    /// - store: 库存存储(提供事务作用域)
    /// - config: 配置读取器
    /// - units: 单位换算表
    pub fn new(store: Arc<S>, config: Arc<C>, units: Arc<UnitTable>) -> Self {
        Self {
            store,
            config,
            units,
        }
    }

    // ==========================================
    // 消耗
    // ==========================================

    /// 完成菜谱: 扣减库存并写入可撤销记录
    pub async fn consume(
        &self,
        recipe_id: &str,
        user_id: &str,
        needs: &[IngredientNeed],
        servings_multiplier: Decimal,
    ) -> ConsumptionResult<ConsumptionReport> {
        self.consume_at(recipe_id, user_id, needs, servings_multiplier, Utc::now())
            .await
    }

    /// 以指定时刻执行消耗(过期判定与撤销窗口均以 now 为准)
    ///
    /// # 流程
    /// 1. 校验输入并按份数缩放需求
    /// 2. 读取配置快照
    /// 3. 单个事务内: 列出批次 → 逐行匹配/选批/扣减 → 写记录
    /// 4. 任一完整性错误(并发修改/存储失败) → 整单回滚
    pub async fn consume_at(
        &self,
        recipe_id: &str,
        user_id: &str,
        needs: &[IngredientNeed],
        servings_multiplier: Decimal,
        now: DateTime<Utc>,
    ) -> ConsumptionResult<ConsumptionReport> {
        require_non_blank("recipe_id", recipe_id)?;
        require_non_blank("user_id", user_id)?;
        let needs = validate_and_scale(needs, servings_multiplier)?;

        let settings = ConsumptionSettings::load(self.config.as_ref()).await?;
        let matcher = settings.matcher();
        let picker = BatchPicker::new(self.units.clone());
        let options = settings.pick_options(now.date_naive());
        let revert_deadline = now.checked_add_signed(settings.revert_window).ok_or_else(|| {
            ConsumptionError::Config(format!(
                "撤销窗口超出时间范围: {} 分钟",
                settings.revert_window.num_minutes()
            ))
        })?;

        info!(
            recipe_id,
            user_id,
            ingredients = needs.len(),
            servings_multiplier = %servings_multiplier,
            "开始消耗菜谱食材"
        );

        let result = self
            .store
            .in_transaction(|tx| -> ConsumptionResult<ConsumptionReport> {
                let mut pool = tx.list_available_batches(user_id)?;

                let mut lines = Vec::with_capacity(needs.len());
                for need in &needs {
                    let line = process_need(
                        &matcher,
                        &picker,
                        &options,
                        &mut pool,
                        need,
                        |_current, selected| {
                            Ok(tx.debit_batch(
                                &selected.batch_id,
                                selected.debit_quantity,
                                selected.expected_revision,
                            )?)
                        },
                    )?;
                    lines.push(line);
                }

                let outcome = decide_outcome(&lines);
                let (record_id, revertible_until) = if outcome == ConsumptionOutcome::NotCooked {
                    (None, None)
                } else {
                    let record = ConsumptionRecord {
                        record_id: Uuid::new_v4().to_string(),
                        recipe_id: recipe_id.to_string(),
                        user_id: user_id.to_string(),
                        created_at: now,
                        revertible_until: revert_deadline,
                        status: RecordStatus::Active,
                        reverted_at: None,
                        line_items: lines.iter().map(LineOutcome::to_record_line).collect(),
                    };
                    tx.insert_record(&record)?;
                    (Some(record.record_id), Some(record.revertible_until))
                };

                Ok(ConsumptionReport {
                    recipe_id: recipe_id.to_string(),
                    outcome,
                    per_ingredient: lines.iter().map(LineOutcome::to_report_line).collect(),
                    record_id,
                    revertible_until,
                })
            });

        match &result {
            Ok(report) => info!(
                recipe_id,
                outcome = %report.outcome,
                record_id = report.record_id.as_deref().unwrap_or("-"),
                missing = report.missing_ingredients().len(),
                shortfalls = report.shortfalls().len(),
                "菜谱食材消耗完成"
            ),
            Err(e) => warn!(recipe_id, error = %e, "消耗失败,整单回滚"),
        }
        result
    }

    // ==========================================
    // 预览
    // ==========================================

    /// 试算: 与 consume 相同的匹配/选批逻辑,不修改库存、不写记录
    pub async fn preview(
        &self,
        user_id: &str,
        needs: &[IngredientNeed],
        servings_multiplier: Decimal,
    ) -> ConsumptionResult<ConsumptionPreview> {
        self.preview_at(user_id, needs, servings_multiplier, Utc::now().date_naive())
            .await
    }

    pub async fn preview_at(
        &self,
        user_id: &str,
        needs: &[IngredientNeed],
        servings_multiplier: Decimal,
        today: NaiveDate,
    ) -> ConsumptionResult<ConsumptionPreview> {
        require_non_blank("user_id", user_id)?;
        let needs = validate_and_scale(needs, servings_multiplier)?;

        let settings = ConsumptionSettings::load(self.config.as_ref()).await?;
        let matcher = settings.matcher();
        let picker = BatchPicker::new(self.units.clone());
        let options = settings.pick_options(today);

        let mut pool = self.store.snapshot_available_batches(user_id)?;
        let mut lines = Vec::with_capacity(needs.len());
        for need in &needs {
            lines.push(process_need(
                &matcher,
                &picker,
                &options,
                &mut pool,
                need,
                simulate_debit,
            )?);
        }

        debug!(user_id, ingredients = lines.len(), "消耗预览完成");

        Ok(ConsumptionPreview {
            outcome: decide_outcome(&lines),
            per_ingredient: lines
                .into_iter()
                .map(|line| PreviewLine {
                    ingredient_name: line.need.ingredient_name.clone(),
                    status: line.line_status(),
                    match_result: line.match_result,
                    selection: line.selection,
                })
                .collect(),
        })
    }
}

// ==========================================
// 单行处理
// ==========================================

/// 单行食材的处理结果(预览与实际扣减共用)
struct LineOutcome {
    need: IngredientNeed,
    state: IngredientState,
    match_result: Option<MatchResult>,
    selection: BatchSelection,
    debits: Vec<RecordDebit>,
}

impl LineOutcome {
    fn line_status(&self) -> LineStatus {
        match self.state {
            IngredientState::Missing => LineStatus::Missing,
            IngredientState::Insufficient => LineStatus::Insufficient,
            _ => LineStatus::Fulfilled,
        }
    }

    fn to_record_line(&self) -> RecordLineItem {
        RecordLineItem {
            ingredient_name: self.need.ingredient_name.clone(),
            status: self.line_status(),
            required_quantity: self.need.required_quantity,
            required_unit: self.need.required_unit.clone(),
            debits: self.debits.clone(),
            shortfall: self.selection.shortfall,
        }
    }

    /// 对外报告行(数量保留 2 位小数)
    fn to_report_line(&self) -> ReportLine {
        let shortfall = self.selection.shortfall;
        let has_shortfall = shortfall > Decimal::ZERO;

        ReportLine {
            ingredient_name: self.need.ingredient_name.clone(),
            status: self.line_status(),
            matched_products: self
                .match_result
                .as_ref()
                .map(|m| m.candidates.clone())
                .unwrap_or_default(),
            match_score: self.match_result.as_ref().map(|m| m.score),
            consumed: self
                .debits
                .iter()
                .map(|d| ConsumedBatch {
                    batch_id: d.batch_id.clone(),
                    product_name: d.product_name.clone(),
                    quantity: round_for_display(d.quantity),
                    unit: d.unit.clone(),
                })
                .collect(),
            shortfall_amount: has_shortfall.then(|| round_for_display(shortfall)),
            shortfall_unit: has_shortfall.then(|| self.need.required_unit.clone()),
            conversion_failures: self.selection.conversion_failures.clone(),
        }
    }
}

/// 单行状态机
struct LineTracker<'a> {
    ingredient: &'a str,
    state: IngredientState,
}

impl<'a> LineTracker<'a> {
    fn new(ingredient: &'a str) -> Self {
        Self {
            ingredient,
            state: IngredientState::Pending,
        }
    }

    fn advance(&mut self, next: IngredientState) -> ConsumptionResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ConsumptionError::InvalidStateTransition {
                ingredient: self.ingredient.to_string(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(ingredient = self.ingredient, from = %self.state, to = %next, "食材状态推进");
        self.state = next;
        Ok(())
    }
}

/// 处理一行食材: 匹配 → 换算/选批 → 扣减
///
/// # 参数
/// - pool: 当前批次快照; 每次扣减后就地更新,后续行看到扣减后的数量
/// - apply_debit: 执行扣减(当前批次, 选择行) → 扣减后的批次
///
/// # 规则
/// 1. 无匹配 → missing
/// 2. 匹配但无可换算/可用批次 → insufficient("有多少用多少"同样适用)
/// 3. 逐批扣减后仍有缺口 → insufficient(已扣部分保留)
fn process_need<F>(
    matcher: &IngredientMatcher,
    picker: &BatchPicker,
    options: &PickOptions,
    pool: &mut [PantryBatch],
    need: &IngredientNeed,
    mut apply_debit: F,
) -> ConsumptionResult<LineOutcome>
where
    F: FnMut(&PantryBatch, &SelectionLine) -> ConsumptionResult<PantryBatch>,
{
    let mut tracker = LineTracker::new(&need.ingredient_name);

    let Some(match_result) = matcher.match_against_batches(&need.ingredient_name, pool) else {
        tracker.advance(IngredientState::Missing)?;
        debug!(ingredient = %need.ingredient_name, "库存中无匹配食材");
        return Ok(LineOutcome {
            need: need.clone(),
            state: tracker.state,
            match_result: None,
            selection: BatchSelection::empty(
                &need.ingredient_name,
                need.required_quantity,
                &need.required_unit,
            ),
            debits: vec![],
        });
    };
    tracker.advance(IngredientState::Matched)?;

    let matched: Vec<PantryBatch> = pool
        .iter()
        .filter(|b| match_result.candidates.contains(&b.product_name))
        .cloned()
        .collect();
    let need = resolve_need_unit(need, &matched, options);
    let selection = picker.select(&matched, &need, options);

    if selection.selections.is_empty()
        && (!selection.is_fulfilled || need.required_quantity.is_none())
    {
        tracker.advance(IngredientState::Insufficient)?;
        warn!(
            ingredient = %need.ingredient_name,
            shortfall = %selection.shortfall,
            conversion_failures = selection.conversion_failures.len(),
            "匹配到食材但无可用批次"
        );
        let state = tracker.state;
        return Ok(LineOutcome {
            need,
            state,
            match_result: Some(match_result),
            selection,
            debits: vec![],
        });
    }
    tracker.advance(IngredientState::Converted)?;
    tracker.advance(IngredientState::Selected)?;

    let mut debits = Vec::with_capacity(selection.selections.len());
    for selected in &selection.selections {
        let slot = pool
            .iter_mut()
            .find(|b| b.batch_id == selected.batch_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "PantryBatch".to_string(),
                id: selected.batch_id.clone(),
            })?;

        let quantity_before = slot.quantity;
        let updated = apply_debit(&*slot, selected)?;
        debits.push(RecordDebit {
            batch_id: selected.batch_id.clone(),
            product_name: selected.product_name.clone(),
            quantity: selected.debit_quantity,
            unit: selected.debit_unit.clone(),
            quantity_before,
            status_consumed: updated.status == BatchStatus::Consumed,
        });
        *slot = updated;
    }

    if selection.is_fulfilled {
        tracker.advance(IngredientState::Debited)?;
    } else {
        tracker.advance(IngredientState::Insufficient)?;
        warn!(
            ingredient = %need.ingredient_name,
            fulfilled = %selection.total_fulfilled,
            shortfall = %selection.shortfall,
            unit = %need.required_unit,
            "食材库存不足,已扣减可用部分"
        );
    }

    let state = tracker.state;
    Ok(LineOutcome {
        need,
        state,
        match_result: Some(match_result),
        selection,
        debits,
    })
}

/// "有多少用多少"且未给单位时,以最先取用批次的单位计量
fn resolve_need_unit(
    need: &IngredientNeed,
    matched: &[PantryBatch],
    options: &PickOptions,
) -> IngredientNeed {
    if need.required_quantity.is_some() || !need.required_unit.trim().is_empty() {
        return need.clone();
    }
    let unit = matched
        .iter()
        .filter(|b| b.is_available())
        .filter(|b| !(options.skip_expired && b.is_expired_on(options.today)))
        .min_by(|a, b| fefo_order(a, b))
        .map(|b| b.unit.clone())
        .unwrap_or_default();

    IngredientNeed {
        required_unit: unit,
        ..need.clone()
    }
}

/// 预览用扣减: 只改快照
fn simulate_debit(batch: &PantryBatch, selected: &SelectionLine) -> ConsumptionResult<PantryBatch> {
    let mut next = batch.clone();
    next.quantity = (next.quantity - selected.debit_quantity).max(Decimal::ZERO);
    if next.quantity.is_zero() {
        next.status = BatchStatus::Consumed;
    }
    next.revision += 1;
    Ok(next)
}

/// 整单结果: 未扣减任何批次 → NotCooked; 全部足量 → Cooked; 否则 CookedWithWarnings
fn decide_outcome(lines: &[LineOutcome]) -> ConsumptionOutcome {
    let any_debit = lines.iter().any(|l| !l.debits.is_empty());
    if !any_debit {
        ConsumptionOutcome::NotCooked
    } else if lines.iter().all(|l| l.line_status() == LineStatus::Fulfilled) {
        ConsumptionOutcome::Cooked
    } else {
        ConsumptionOutcome::CookedWithWarnings
    }
}

// ==========================================
// 输入校验
// ==========================================

fn require_non_blank(field: &str, value: &str) -> ConsumptionResult<()> {
    if value.trim().is_empty() {
        return Err(ConsumptionError::InvalidInput(format!("{} 不能为空", field)));
    }
    Ok(())
}

/// 校验需求并按份数倍数缩放
///
/// 单位缺失/未知不在此拒绝,由选批阶段按行记入 conversion_failures
pub(super) fn validate_and_scale(
    needs: &[IngredientNeed],
    servings_multiplier: Decimal,
) -> ConsumptionResult<Vec<IngredientNeed>> {
    if needs.is_empty() {
        return Err(ConsumptionError::InvalidInput("食材需求列表为空".to_string()));
    }
    if servings_multiplier <= Decimal::ZERO {
        return Err(ConsumptionError::InvalidInput(format!(
            "份数倍数必须大于 0: {}",
            servings_multiplier
        )));
    }

    for (idx, need) in needs.iter().enumerate() {
        if need.ingredient_name.trim().is_empty() {
            return Err(ConsumptionError::InvalidInput(format!(
                "第 {} 行食材名称为空",
                idx + 1
            )));
        }
        if let Some(q) = need.required_quantity {
            if q < Decimal::ZERO {
                return Err(ConsumptionError::InvalidInput(format!(
                    "食材数量不能为负: {} = {}",
                    need.ingredient_name, q
                )));
            }
        }
    }

    needs
        .iter()
        .map(|need| {
            need.scaled(servings_multiplier).ok_or_else(|| {
                ConsumptionError::InvalidInput(format!(
                    "食材数量按份数缩放后溢出: {} × {}",
                    need.ingredient_name, servings_multiplier
                ))
            })
        })
        .collect()
}
