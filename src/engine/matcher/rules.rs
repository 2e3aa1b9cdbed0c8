use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// ==========================================
// MatchKind - 匹配类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,            // 忽略大小写完全一致
    PluralVariant,    // 单复数变体(尾缀 s/es)
    RequestInProduct, // 食材名是商品名的子串
    ProductInRequest, // 商品名是食材名的子串
    Substitution,     // 替换表命中
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchKind::Exact => "exact",
            MatchKind::PluralVariant => "plural_variant",
            MatchKind::RequestInProduct => "request_in_product",
            MatchKind::ProductInRequest => "product_in_request",
            MatchKind::Substitution => "substitution",
        };
        write!(f, "{}", s)
    }
}

/// 谓词参数: (规范化食材名, 规范化商品名, 替换表)
pub type MatchPredicate = fn(&str, &str, &SubstitutionTable) -> bool;

// ==========================================
// MatchRule - 评分规则
// ==========================================
#[derive(Clone)]
pub struct MatchRule {
    pub kind: MatchKind,
    pub score: u8,
    pub predicate: MatchPredicate,
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchRule")
            .field("kind", &self.kind)
            .field("score", &self.score)
            .finish()
    }
}

/// 默认规则表(按分数降序)
pub fn default_rules() -> Vec<MatchRule> {
    vec![
        MatchRule {
            kind: MatchKind::Exact,
            score: 100,
            predicate: |req, prod, _| req == prod,
        },
        MatchRule {
            kind: MatchKind::PluralVariant,
            score: 90,
            predicate: |req, prod, _| is_plural_variant(req, prod),
        },
        MatchRule {
            kind: MatchKind::RequestInProduct,
            score: 80,
            predicate: |req, prod, _| prod.contains(req),
        },
        MatchRule {
            kind: MatchKind::ProductInRequest,
            score: 70,
            predicate: |req, prod, _| req.contains(prod),
        },
        MatchRule {
            kind: MatchKind::Substitution,
            score: 60,
            predicate: |req, prod, subs| subs.are_substitutes(req, prod),
        },
    ]
}

/// 名称规范化: 去首尾空白、小写、合并连续空白
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 单复数判定: 仅尾缀 s / es 规则(不做词干提取)
// TODO: 不规则复数(leaf/leaves, berry/berries)需要词干表,目前落入子串/替换规则
pub(crate) fn is_plural_variant(a: &str, b: &str) -> bool {
    if a == b || a.is_empty() || b.is_empty() {
        return false;
    }
    let plural_of = |long: &str, short: &str| {
        long.strip_suffix("es") == Some(short) || long.strip_suffix('s') == Some(short)
    };
    plural_of(a, b) || plural_of(b, a)
}

/// 去掉尾缀后的候选形态(含原形)
fn suffix_forms(name: &str) -> Vec<&str> {
    let mut forms = vec![name];
    if let Some(s) = name.strip_suffix("es") {
        if !s.is_empty() {
            forms.push(s);
        }
    }
    if let Some(s) = name.strip_suffix('s') {
        if !s.is_empty() {
            forms.push(s);
        }
    }
    forms
}

// ==========================================
// SubstitutionTable - 食材替换表
// ==========================================
// 双向: add_pair(a, b) 同时登记 a→b 与 b→a
#[derive(Debug, Clone, Default)]
pub struct SubstitutionTable {
    pairs: HashMap<String, BTreeSet<String>>,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置替换表
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        let defaults: &[(&str, &str)] = &[
            ("scallion", "green onion"),
            ("scallion", "spring onion"),
            ("green onion", "spring onion"),
            ("cilantro", "coriander"),
            ("eggplant", "aubergine"),
            ("zucchini", "courgette"),
            ("bell pepper", "capsicum"),
            ("garbanzo bean", "chickpea"),
            ("confectioners sugar", "powdered sugar"),
            ("pasta", "spaghetti"),
            ("pasta", "penne"),
            ("pasta", "macaroni"),
            ("pasta", "fusilli"),
            ("pasta", "linguine"),
            ("pasta", "fettuccine"),
            ("pasta", "rigatoni"),
        ];
        for (a, b) in defaults {
            table.add_pair(a, b);
        }
        table
    }

    pub fn add_pair(&mut self, a: &str, b: &str) {
        let (a, b) = (normalize_name(a), normalize_name(b));
        if a.is_empty() || b.is_empty() || a == b {
            return;
        }
        self.pairs.entry(a.clone()).or_default().insert(b.clone());
        self.pairs.entry(b).or_default().insert(a);
    }

    pub fn extend<I, S>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        for (a, b) in pairs {
            self.add_pair(a.as_ref(), b.as_ref());
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.values().map(|v| v.len()).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// 判断商品是否为食材的登记替代品
    ///
    /// 食材名(含去尾缀形态)查表,商品名等于、包含替代名,或其去尾缀形态等于替代名即命中
    pub fn are_substitutes(&self, requested: &str, product: &str) -> bool {
        let product_forms = suffix_forms(product);
        suffix_forms(requested)
            .into_iter()
            .filter_map(|form| self.pairs.get(form))
            .flatten()
            .any(|alt| product.contains(alt.as_str()) || product_forms.contains(&alt.as_str()))
    }
}
