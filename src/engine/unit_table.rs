// ==========================================
// 食材库存消耗引擎 - 单位换算表
// ==========================================
// 职责: 同一计量类别内的单位换算(重量/体积/计数)
// 红线: 无状态、无副作用; 跨类别换算一律报错,不返回数值
// 精度: 换算系数为精确小数,内部全精度,只在对外展示时取整
// ==========================================

use crate::domain::types::MeasurementCategory;
use crate::engine::error::UnitError;
use rust_decimal::Decimal;
use std::collections::HashMap;

// ==========================================
// UnitDefinition - 单位定义
// ==========================================
// factor_to_base: 1 单位 = factor_to_base 个基准单位
// 基准单位: weight → g, volume → ml, count → each
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDefinition {
    pub code: String,
    pub category: MeasurementCategory,
    pub factor_to_base: Decimal,
}

// ==========================================
// UnitTable - 单位注册表
// ==========================================
// 作为显式依赖注入编排器,不使用全局单例
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    units: HashMap<String, UnitDefinition>,
    aliases: HashMap<String, String>,
}

impl UnitTable {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 标准单位表(美制常用单位 + 公制)
    pub fn standard() -> Self {
        let mut table = Self::new();

        // ===== 重量 (基准: g) =====
        table.register("mg", MeasurementCategory::Weight, Decimal::new(1, 3));
        table.register("g", MeasurementCategory::Weight, Decimal::ONE);
        table.register("kg", MeasurementCategory::Weight, Decimal::from(1000));
        table.register("oz", MeasurementCategory::Weight, Decimal::new(28_349_523_125, 9));
        table.register("lb", MeasurementCategory::Weight, Decimal::new(45_359_237, 5));

        // ===== 体积 (基准: ml) =====
        table.register("ml", MeasurementCategory::Volume, Decimal::ONE);
        table.register("l", MeasurementCategory::Volume, Decimal::from(1000));
        table.register("tsp", MeasurementCategory::Volume, Decimal::new(492_892_159_375, 11));
        table.register("tbsp", MeasurementCategory::Volume, Decimal::new(1_478_676_478_125, 11));
        table.register("fl_oz", MeasurementCategory::Volume, Decimal::new(295_735_295_625, 10));
        table.register("cup", MeasurementCategory::Volume, Decimal::new(2_365_882_365, 7));
        table.register("pt", MeasurementCategory::Volume, Decimal::new(473_176_473, 6));
        table.register("qt", MeasurementCategory::Volume, Decimal::new(946_352_946, 6));
        table.register("gal", MeasurementCategory::Volume, Decimal::new(3_785_411_784, 6));

        // ===== 计数 (基准: each) =====
        // 包装类单位按 1 个计
        table.register("each", MeasurementCategory::Count, Decimal::ONE);
        table.register("pair", MeasurementCategory::Count, Decimal::from(2));
        table.register("dozen", MeasurementCategory::Count, Decimal::from(12));
        for container in ["package", "can", "bottle", "bag", "box", "jar", "clove", "slice"] {
            table.register(container, MeasurementCategory::Count, Decimal::ONE);
        }

        // ===== 别名 =====
        let aliases: &[(&str, &[&str])] = &[
            ("mg", &["milligram", "milligrams"]),
            ("g", &["gram", "grams", "gr", "gm"]),
            ("kg", &["kilogram", "kilograms", "kgs", "kilo", "kilos"]),
            ("oz", &["ounce", "ounces"]),
            ("lb", &["lbs", "pound", "pounds"]),
            ("ml", &["milliliter", "milliliters", "millilitre", "millilitres", "mls"]),
            ("l", &["liter", "liters", "litre", "litres"]),
            ("tsp", &["teaspoon", "teaspoons", "tsps"]),
            ("tbsp", &["tablespoon", "tablespoons", "tbsps", "tbs", "tbl"]),
            ("fl_oz", &["floz", "fluid_ounce", "fluid_ounces"]),
            ("cup", &["cups", "c"]),
            ("pt", &["pint", "pints"]),
            ("qt", &["quart", "quarts"]),
            ("gal", &["gallon", "gallons"]),
            ("each", &["ea", "piece", "pieces", "pc", "pcs", "item", "items", "whole", "unit", "units"]),
            ("pair", &["pairs"]),
            ("dozen", &["dozens", "doz"]),
            ("package", &["packages", "pkg", "pkgs", "pack", "packs"]),
            ("can", &["cans"]),
            ("bottle", &["bottles"]),
            ("bag", &["bags"]),
            ("box", &["boxes"]),
            ("jar", &["jars"]),
            ("clove", &["cloves"]),
            ("slice", &["slices"]),
        ];
        for (code, names) in aliases {
            for name in names.iter() {
                table.add_alias(name, code);
            }
        }

        table
    }

    /// 注册单位(新单位通过数据扩展,不改代码)
    pub fn register(&mut self, code: &str, category: MeasurementCategory, factor_to_base: Decimal) {
        let code = normalize_unit(code);
        self.units.insert(
            code.clone(),
            UnitDefinition {
                code,
                category,
                factor_to_base,
            },
        );
    }

    /// 注册别名
    pub fn add_alias(&mut self, alias: &str, code: &str) {
        self.aliases.insert(normalize_unit(alias), normalize_unit(code));
    }

    /// 解析单位字符串
    pub fn resolve(&self, unit: &str) -> Result<&UnitDefinition, UnitError> {
        let key = normalize_unit(unit);
        let code = self.aliases.get(&key).unwrap_or(&key);
        self.units
            .get(code)
            .ok_or_else(|| UnitError::UnknownUnit(unit.to_string()))
    }

    pub fn is_known(&self, unit: &str) -> bool {
        self.resolve(unit).is_ok()
    }

    /// 规范单位代码
    pub fn canonical(&self, unit: &str) -> Result<&str, UnitError> {
        self.resolve(unit).map(|d| d.code.as_str())
    }

    pub fn category_of(&self, unit: &str) -> Result<MeasurementCategory, UnitError> {
        self.resolve(unit).map(|d| d.category)
    }

    /// 单位换算
    ///
    /// # 规则
    /// - 两个单位必须已注册,否则 UnknownUnit
    /// - 两个单位必须同类别,否则 IncompatibleUnits
    /// - amount' = amount × factor(from) ÷ factor(to)
    pub fn convert(&self, amount: Decimal, from_unit: &str, to_unit: &str) -> Result<Decimal, UnitError> {
        let from = self.resolve(from_unit)?;
        let to = self.resolve(to_unit)?;

        if from.category != to.category {
            return Err(UnitError::IncompatibleUnits {
                from: from.code.clone(),
                to: to.code.clone(),
                from_category: from.category,
                to_category: to.category,
            });
        }

        if from.code == to.code {
            return Ok(amount);
        }

        let overflow = || UnitError::Overflow {
            amount: amount.to_string(),
            from: from.code.clone(),
            to: to.code.clone(),
        };

        amount
            .checked_mul(from.factor_to_base)
            .and_then(|base| base.checked_div(to.factor_to_base))
            .map(|v| v.normalize())
            .ok_or_else(overflow)
    }
}

/// 单位字符串规范化: 去首尾空白、小写、去句点、空白/连字符合并为下划线
pub fn normalize_unit(unit: &str) -> String {
    let lowered = unit.trim().to_lowercase().replace('.', "");
    lowered
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
