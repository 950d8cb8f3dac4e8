// ==========================================
// 商品目录生成系统 - 促销规则领域模型
// ==========================================
// 红线: 规则表载入后不可变,调度引擎只读
// 时间窗口: [from, to) 绝对时间,过期以 to 判定
// ==========================================

use crate::domain::types::PriceTier;
use crate::importer::error::{ParseError, ParseResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Discount - 折扣表达式
// ==========================================
// 百分比作用于档位当前原价;绝对金额直接作为促销价
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Discount {
    /// 折扣百分比（"25%" → 促销价 = 原价 × (100-25)/100）
    Percent(f64),
    /// 绝对金额（"$45" 或 "45" → 促销价 = 45,仅正数生效）
    Absolute(f64),
}

impl Discount {
    /// 解析折扣表达式
    ///
    /// # 规则
    /// 1. 含 '%' → 百分比（去掉 % 后解析数值）
    /// 2. 否则 → 绝对金额（容忍 '$' 前缀与千分位逗号）
    /// 3. 解析失败或绝对金额非正 → None
    pub fn parse(expr: &str) -> Option<Discount> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(stripped) = trimmed.strip_suffix('%') {
            return stripped.trim().parse::<f64>().ok().map(Discount::Percent);
        }
        let normalized = trimmed.trim_start_matches('$').replace(',', "");
        match normalized.trim().parse::<f64>() {
            Ok(amount) if amount > 0.0 => Some(Discount::Absolute(amount)),
            _ => None,
        }
    }

    /// 计算档位促销价
    ///
    /// # 参数
    /// - regular_price: 档位当前原价（缺失时百分比折扣不生效）
    ///
    /// # 返回
    /// - Some(f64): 促销价
    /// - None: 无法计算（原价缺失/金额非正）
    pub fn sale_price(&self, regular_price: Option<f64>) -> Option<f64> {
        match self {
            Discount::Percent(pct) => {
                regular_price.map(|regular| regular * (100.0 - pct) / 100.0)
            }
            Discount::Absolute(amount) => {
                if *amount > 0.0 {
                    Some(*amount)
                } else {
                    None
                }
            }
        }
    }
}

// ==========================================
// SpecialRule - 促销规则
// ==========================================
// 由促销规则表一行载入,身份为声明的 ID（而非行号）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialRule {
    pub id: String,
    /// 激活窗口开始（含）
    pub from: DateTime<Utc>,
    /// 激活窗口结束（不含）,now >= to 视为过期
    pub to: DateTime<Utc>,
    /// 各档位折扣表达式,至多六档
    pub discounts: BTreeMap<PriceTier, Discount>,
}

impl SpecialRule {
    /// 规则是否已过期
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.to
    }

    /// 解析 DD/MM/YYYY 日期为当日零点（UTC）
    pub fn parse_window_date(value: &str, field: &str, row: usize) -> ParseResult<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y").map_err(|_| {
            ParseError::DateFormatError {
                row,
                field: field.to_string(),
                value: value.to_string(),
            }
        })?;
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| ParseError::DateFormatError {
            row,
            field: field.to_string(),
            value: value.to_string(),
        })?;
        Ok(DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc))
    }
}
