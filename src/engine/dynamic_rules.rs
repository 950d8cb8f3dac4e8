// ==========================================
// 商品目录生成系统 - 动态规则注入引擎
// ==========================================
// 职责: DYNCAT/DYNPROD 规则 ID 列表 → 规则对象注入 + 摘要渲染
// 前置: 必须在层级构建之后运行（需要完整祖先链）
// 与促销调度无共享状态,两者可任意先后
// ==========================================

use crate::domain::node::Node;
use crate::domain::rule::DynamicRule;
use crate::domain::types::DynKind;
use crate::importer::column_map::ColumnMap;
use crate::importer::error::{ParseError, ParseResult};
use crate::importer::record_builder::{is_blank_row, RecordBuilder};
use crate::importer::row_source::RowSource;
use crate::registry::{ConflictPolicy, MultiRegistry, Registry};
use std::collections::BTreeMap;
use tracing::info;

/// 摘要片段连接符（目录导出格式要求 HTML 换行）
const SUMMARY_DELIMITER: &str = "<br/>";

// ==========================================
// DynamicRuleEngine - 动态规则注入引擎
// ==========================================
pub struct DynamicRuleEngine;

impl DynamicRuleEngine {
    /// 对单个节点注入一类动态规则并渲染摘要
    ///
    /// # 规则
    /// 1. id_lists 为调用方收集的规则 ID 列（管道分隔,已按链序排列;
    ///    分类规则来自祖先链,产品规则来自节点自身）
    /// 2. ID 按身份去重,保持首次出现顺序
    /// 3. ID 不在规则表 → 记引用错误,该 ID 不进入摘要
    /// 4. 摘要 = 已解析规则 HTML 按序连接 → 写入 dprcsum/dprpsum
    ///
    /// # 返回
    /// 引用错误信息列表
    pub fn apply(
        node: &mut Node,
        kind: DynKind,
        id_lists: &[String],
        rules: &BTreeMap<String, DynamicRule>,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        let mut ordered_ids: Vec<String> = Vec::new();

        for list in id_lists {
            for id in list.split('|').map(str::trim).filter(|id| !id.is_empty()) {
                if !ordered_ids.iter().any(|seen| seen == id) {
                    ordered_ids.push(id.to_string());
                }
            }
        }

        let mut fragments: Vec<&str> = Vec::new();
        for id in &ordered_ids {
            match rules.get(id) {
                Some(rule) => fragments.push(rule.to_html()),
                None => errors.push(format!("{} 规则不存在: {}", kind, id)),
            }
        }

        node.set(kind.summary_key(), fragments.join(SUMMARY_DELIMITER));
        match kind {
            DynKind::Category => node.cat_rule_ids = ordered_ids,
            DynKind::Product => node.prod_rule_ids = ordered_ids,
        }

        errors
    }

    /// 从行来源解析动态规则表（ID + HTML 两列）
    ///
    /// 规则身份 = 声明的 ID 列;重复 ID 保留先登记的规则并记录错误
    pub fn parse_table(
        source: &dyn RowSource,
    ) -> ParseResult<(BTreeMap<String, DynamicRule>, MultiRegistry<usize, String>)> {
        let declared: Vec<String> = vec!["ID".to_string(), "HTML".to_string()];
        let defaults = BTreeMap::new();
        let mut errors: MultiRegistry<usize, String> = MultiRegistry::new("dyn_rule_errors");
        let mut registry: Registry<String, DynamicRule> =
            Registry::new("dynamic_rules", ConflictPolicy::Raise);

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

            let id = match record.get("ID") {
                Some(id) => id.to_string(),
                None => {
                    errors.append(
                        rowcount,
                        ParseError::RowError {
                            row: rowcount,
                            message: "动态规则缺少 ID".to_string(),
                        }
                        .to_string(),
                    );
                    continue;
                }
            };
            let html = record.get("HTML").unwrap_or("").to_string();

            if let Err(duplicate) = registry.register(id.clone(), DynamicRule::new(id, html)) {
                errors.append(rowcount, duplicate.to_string());
            }
        }

        info!(
            rules = registry.len(),
            error_rows = errors.len(),
            "动态规则表解析完成"
        );

        Ok((registry.into_inner(), errors))
    }
}
