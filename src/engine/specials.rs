// ==========================================
// 商品目录生成系统 - 促销调度引擎
// ==========================================
// 职责: 计划标记列表 → 规则表匹配 → 各档位促销价计算
// 红线: 同档位后处理的标记覆盖先处理的（last-token-wins,
//       标记顺序即优先级,无其他优先级契约）
// 红线: 同节点同规则表同时刻重跑结果一致（幂等）
// ==========================================

use crate::domain::node::Node;
use crate::domain::special::SpecialRule;
use crate::domain::types::PriceTier;
use crate::importer::error::ParseResult;
use crate::importer::record_builder::{is_blank_row, ImportRecord, RecordBuilder};
use crate::importer::row_source::RowSource;
use crate::importer::column_map::ColumnMap;
use crate::registry::{ConflictPolicy, MultiRegistry, Registry};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 解析计划标记列表（管道/空白分隔）
pub fn find_all_tokens(token_string: &str) -> Vec<String> {
    token_string
        .split(|c: char| c == '|' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

// ==========================================
// SpecialsEngine - 促销调度引擎
// ==========================================
// 无状态引擎,规则表与当前时刻通过参数传入
pub struct SpecialsEngine;

impl SpecialsEngine {
    /// 对单个节点应用促销规则
    ///
    /// # 规则
    /// 1. 标记不在规则表 → 记引用错误,跳过该标记
    /// 2. now >= to → 规则过期,不写任何档位字段
    /// 3. 百分比折扣: 促销价 = 档位原价 × (100-pct)/100,原价缺失不写
    /// 4. 绝对折扣: 金额为正时直接作为促销价
    /// 5. 写 <档位>S/<档位>F/<档位>T,同档位后者覆盖前者
    /// 6. 收尾镜像零售普通档: price/sale_price/sale_price_dates_from/to
    ///
    /// # 参数
    /// - node: 目标节点（字段就地写入）
    /// - tokens: 含继承在内的完整标记序列（顺序即优先级）
    /// - rules: 规则表（ID → 规则）
    /// - now: 当前时刻
    ///
    /// # 返回
    /// 引用错误信息列表（由会话按节点行号登记）
    pub fn apply(
        node: &mut Node,
        tokens: &[String],
        rules: &BTreeMap<String, SpecialRule>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut errors = Vec::new();

        for token in tokens {
            let rule = match rules.get(token) {
                Some(rule) => rule,
                None => {
                    errors.push(format!("促销规则不存在: {} (节点 {})", token, node.codesum));
                    continue;
                }
            };

            if rule.is_expired(now) {
                debug!(
                    codesum = %node.codesum,
                    token = %token,
                    to = %rule.to,
                    "促销规则已过期,跳过"
                );
                continue;
            }

            for tier in PriceTier::ALL {
                let discount = match rule.discounts.get(&tier) {
                    Some(discount) => discount,
                    None => continue,
                };

                let regular_price = node
                    .get(tier.regular_key())
                    .and_then(|value| value.parse::<f64>().ok());

                if let Some(sale_price) = discount.sale_price(regular_price) {
                    debug!(
                        codesum = %node.codesum,
                        tier = %tier,
                        sale_price,
                        token = %token,
                        "写入档位促销价"
                    );
                    node.set(tier.sale_key(), format!("{:.2}", sale_price));
                    node.set(tier.from_key(), rule.from.timestamp().to_string());
                    node.set(tier.to_key(), rule.to.timestamp().to_string());
                }
            }
        }

        // 零售普通档镜像到通用价格字段
        let mirrors = [
            ("price", PriceTier::RetailNormal.regular_key()),
            ("sale_price", PriceTier::RetailNormal.sale_key()),
            ("sale_price_dates_from", PriceTier::RetailNormal.from_key()),
            ("sale_price_dates_to", PriceTier::RetailNormal.to_key()),
        ];
        for (target, origin) in mirrors {
            if let Some(value) = node.get(origin).map(str::to_string) {
                node.set(target, value);
            }
        }

        errors
    }

    /// 从行来源解析促销规则表
    ///
    /// 规则行身份 = 声明的 ID 列（覆盖缺省的行号身份）;
    /// ID 重复时保留先登记的规则并记录错误
    ///
    /// # 返回
    /// - (规则表, 错误日志按行号)
    pub fn parse_table(
        source: &dyn RowSource,
    ) -> ParseResult<(BTreeMap<String, SpecialRule>, MultiRegistry<usize, String>)> {
        let declared: Vec<String> = SPECIALS_TABLE_COLUMNS
            .iter()
            .map(|col| col.to_string())
            .collect();
        let defaults = BTreeMap::new();
        let mut errors: MultiRegistry<usize, String> = MultiRegistry::new("specials_errors");
        let mut registry: Registry<String, SpecialRule> =
            Registry::new("specials", ConflictPolicy::Raise);

        let rows = source.read_rows()?;
        let mut column_map: Option<ColumnMap> = None;
        let mut rowcount = 0usize;

        for row in rows {
            rowcount += 1;
            if is_blank_row(&row) {
                continue;
            }

            let map = match column_map.as_ref() {
                Some(map) => map,
                None => {
                    let (map, missing) = ColumnMap::analyze_header(&declared, &row)?;
                    for col in missing {
                        errors.append(rowcount, format!("声明列在表头中缺失: {}", col));
                    }
                    column_map = Some(map);
                    continue;
                }
            };

            let builder = RecordBuilder::new(&declared, &defaults, map, None);
            let record = builder.build(rowcount, &row);

            match Self::rule_from_record(&record) {
                Ok(rule) => {
                    if let Err(duplicate) = registry.register(rule.id.clone(), rule) {
                        errors.append(rowcount, duplicate.to_string());
                    }
                }
                Err(err) => errors.append(rowcount, err.to_string()),
            }
        }

        info!(
            rules = registry.len(),
            error_rows = errors.len(),
            "促销规则表解析完成"
        );

        Ok((registry.into_inner(), errors))
    }

    /// 单条规则行 → SpecialRule
    fn rule_from_record(record: &ImportRecord) -> ParseResult<SpecialRule> {
        let rowcount = record.rowcount;
        let id = record
            .get("ID")
            .ok_or_else(|| crate::importer::error::ParseError::RowError {
                row: rowcount,
                message: "促销规则缺少 ID".to_string(),
            })?
            .to_string();

        let from_raw =
            record
                .get("FROM")
                .ok_or_else(|| crate::importer::error::ParseError::RowError {
                    row: rowcount,
                    message: format!("促销规则 {} 缺少 FROM", id),
                })?;
        let to_raw = record
            .get("TO")
            .ok_or_else(|| crate::importer::error::ParseError::RowError {
                row: rowcount,
                message: format!("促销规则 {} 缺少 TO", id),
            })?;

        let from = SpecialRule::parse_window_date(from_raw, "FROM", rowcount)?;
        let to = SpecialRule::parse_window_date(to_raw, "TO", rowcount)?;

        let mut discounts = BTreeMap::new();
        for tier in PriceTier::ALL {
            if let Some(expr) = record.get(tier.sale_key()) {
                if let Some(discount) = crate::domain::special::Discount::parse(expr) {
                    discounts.insert(tier, discount);
                }
            }
        }

        Ok(SpecialRule {
            id,
            from,
            to,
            discounts,
        })
    }
}

/// 促销规则表声明列
const SPECIALS_TABLE_COLUMNS: &[&str] = &[
    "ID", "FROM", "TO", "RNS", "RPS", "WNS", "WPS", "DNS", "DPS",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::{NodeArena, NodeKind};
    use crate::domain::special::Discount;
    use crate::importer::row_source::VecRowSource;
    use chrono::TimeZone;

    fn make_node(fields: &[(&str, &str)]) -> Node {
        let mut arena = NodeArena::new();
        let field_map: BTreeMap<String, String> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let id = arena.alloc(
            NodeKind::Item,
            1,
            NodeArena::ROOT,
            2,
            Vec::new(),
            None,
            "测试产品".to_string(),
            "P1".to_string(),
            field_map,
        );
        arena.get(id).clone()
    }

    fn rule(id: &str, to_year: i32, discounts: &[(PriceTier, Discount)]) -> SpecialRule {
        SpecialRule {
            id: id.to_string(),
            from: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(to_year, 6, 1, 0, 0, 0).unwrap(),
            discounts: discounts.iter().copied().collect(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_apply_percent_discount() {
        let mut node = make_node(&[("RNR", "100.00")]);
        let mut rules = BTreeMap::new();
        rules.insert(
            "SPRING".to_string(),
            rule("SPRING", 2026, &[(PriceTier::RetailNormal, Discount::Percent(25.0))]),
        );

        let errors =
            SpecialsEngine::apply(&mut node, &["SPRING".to_string()], &rules, now());

        assert!(errors.is_empty());
        assert_eq!(node.get("RNS"), Some("75.00"));
        assert!(node.get("RNF").is_some());
        assert!(node.get("RNT").is_some());
        // 通用字段镜像零售普通档
        assert_eq!(node.get("price"), Some("100.00"));
        assert_eq!(node.get("sale_price"), Some("75.00"));
    }

    #[test]
    fn test_apply_percent_without_regular_price() {
        let mut node = make_node(&[]);
        let mut rules = BTreeMap::new();
        rules.insert(
            "SPRING".to_string(),
            rule("SPRING", 2026, &[(PriceTier::RetailNormal, Discount::Percent(25.0))]),
        );

        let errors =
            SpecialsEngine::apply(&mut node, &["SPRING".to_string()], &rules, now());

        // 原价缺失: 不写促销价,不崩溃
        assert!(errors.is_empty());
        assert_eq!(node.get("RNS"), None);
    }

    #[test]
    fn test_apply_expired_rule_writes_nothing() {
        let mut node = make_node(&[("RNR", "100.00"), ("WNR", "80.00")]);
        let mut rules = BTreeMap::new();
        rules.insert(
            "OLD".to_string(),
            rule(
                "OLD",
                2020,
                &[
                    (PriceTier::RetailNormal, Discount::Percent(50.0)),
                    (PriceTier::WholesaleNormal, Discount::Absolute(10.0)),
                ],
            ),
        );

        let errors = SpecialsEngine::apply(&mut node, &["OLD".to_string()], &rules, now());

        assert!(errors.is_empty());
        assert_eq!(node.get("RNS"), None);
        assert_eq!(node.get("WNS"), None);
    }

    #[test]
    fn test_apply_unknown_token_registers_error() {
        let mut node = make_node(&[("RNR", "100.00")]);
        let rules = BTreeMap::new();

        let errors =
            SpecialsEngine::apply(&mut node, &["MISSING".to_string()], &rules, now());

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("MISSING"));
    }

    #[test]
    fn test_apply_last_token_wins_per_tier() {
        let mut node = make_node(&[("RNR", "100.00")]);
        let mut rules = BTreeMap::new();
        rules.insert(
            "FIRST".to_string(),
            rule("FIRST", 2026, &[(PriceTier::RetailNormal, Discount::Percent(10.0))]),
        );
        rules.insert(
            "SECOND".to_string(),
            rule("SECOND", 2027, &[(PriceTier::RetailNormal, Discount::Percent(50.0))]),
        );

        let tokens = vec!["FIRST".to_string(), "SECOND".to_string()];
        let errors = SpecialsEngine::apply(&mut node, &tokens, &rules, now());

        assert!(errors.is_empty());
        // 后处理的标记覆盖
        assert_eq!(node.get("RNS"), Some("50.00"));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut node = make_node(&[("RNR", "100.00")]);
        let mut rules = BTreeMap::new();
        rules.insert(
            "SPRING".to_string(),
            rule("SPRING", 2026, &[(PriceTier::RetailNormal, Discount::Percent(25.0))]),
        );
        let tokens = vec!["SPRING".to_string()];

        SpecialsEngine::apply(&mut node, &tokens, &rules, now());
        let snapshot = node.fields.clone();
        SpecialsEngine::apply(&mut node, &tokens, &rules, now());

        assert_eq!(node.fields, snapshot);
    }

    #[test]
    fn test_find_all_tokens() {
        assert_eq!(
            find_all_tokens("SPRING|EOFY  XMAS"),
            vec!["SPRING", "EOFY", "XMAS"]
        );
        assert_eq!(find_all_tokens("  "), Vec::<String>::new());
        assert_eq!(find_all_tokens("| SOLO |"), vec!["SOLO"]);
    }

    #[test]
    fn test_parse_table_basic() {
        let source = VecRowSource::new(
            "specials",
            vec![
                vec![
                    "ID".into(),
                    "FROM".into(),
                    "TO".into(),
                    "RNS".into(),
                    "WNS".into(),
                ],
                vec![
                    "SPRING".into(),
                    "01/03/2026".into(),
                    "01/06/2026".into(),
                    "25%".into(),
                    "$45".into(),
                ],
            ],
        );

        let (rules, errors) = SpecialsEngine::parse_table(&source).unwrap();

        // 未声明于表头的档位列（RPS/WPS/DNS/DPS）各记一次模式错误
        assert_eq!(errors.total(), 4);
        let rule = rules.get("SPRING").unwrap();
        assert_eq!(
            rule.discounts.get(&PriceTier::RetailNormal),
            Some(&Discount::Percent(25.0))
        );
        assert_eq!(
            rule.discounts.get(&PriceTier::WholesaleNormal),
            Some(&Discount::Absolute(45.0))
        );
    }

    #[test]
    fn test_parse_table_duplicate_id_keeps_first() {
        let source = VecRowSource::new(
            "specials",
            vec![
                vec!["ID".into(), "FROM".into(), "TO".into(), "RNS".into()],
                vec![
                    "EOFY".into(),
                    "01/05/2026".into(),
                    "30/06/2026".into(),
                    "10%".into(),
                ],
                vec![
                    "EOFY".into(),
                    "01/05/2026".into(),
                    "30/06/2026".into(),
                    "99%".into(),
                ],
            ],
        );

        let (rules, errors) = SpecialsEngine::parse_table(&source).unwrap();

        assert_eq!(
            rules.get("EOFY").unwrap().discounts.get(&PriceTier::RetailNormal),
            Some(&Discount::Percent(10.0))
        );
        // 重复 ID 记错误
        assert!(errors.get(&3).is_some());
    }

    #[test]
    fn test_parse_table_missing_window_drops_row() {
        let source = VecRowSource::new(
            "specials",
            vec![
                vec!["ID".into(), "FROM".into(), "TO".into(), "RNS".into()],
                vec!["BAD".into(), "".into(), "30/06/2026".into(), "10%".into()],
            ],
        );

        let (rules, errors) = SpecialsEngine::parse_table(&source).unwrap();

        assert!(rules.is_empty());
        assert!(errors.get(&2).is_some());
    }
}
