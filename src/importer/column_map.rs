// ==========================================
// 商品目录生成系统 - 表头分析
// ==========================================
// 职责: 声明列名 → 表头位置映射
// 规则: 声明列缺失 → 记录模式错误（非致命）
//       表头完全无法匹配 → 致命错误
// ==========================================

use crate::importer::error::{ParseError, ParseResult};
use std::collections::BTreeMap;
use tracing::debug;

/// 单元格标准化: 去首尾空白
///
/// 表头匹配与数据读取共用同一个清洗钩子
pub fn sanitize_cell(cell: &str) -> String {
    cell.trim().to_string()
}

// ==========================================
// ColumnMap - 列名到位置的映射
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnMap {
    indices: BTreeMap<String, usize>,
}

impl ColumnMap {
    /// 分析表头行
    ///
    /// # 参数
    /// - declared: 声明的列名（不要求覆盖表头全部列）
    /// - header: 表头行
    ///
    /// # 返回
    /// - Ok((map, missing)): 映射 + 缺失列清单（每列记录一次）
    /// - Err(HeaderUnusable): 没有任何声明列能匹配
    pub fn analyze_header(
        declared: &[String],
        header: &[String],
    ) -> ParseResult<(ColumnMap, Vec<String>)> {
        let sanitized_header: Vec<String> =
            header.iter().map(|cell| sanitize_cell(cell)).collect();

        let mut indices = BTreeMap::new();
        let mut missing = Vec::new();

        for col in declared {
            let sanitized_col = sanitize_cell(col);
            match sanitized_header
                .iter()
                .position(|cell| *cell == sanitized_col)
            {
                Some(position) => {
                    debug!(column = %col, position, "表头列定位");
                    indices.insert(col.clone(), position);
                }
                None => missing.push(col.clone()),
            }
        }

        if indices.is_empty() {
            return Err(ParseError::HeaderUnusable(format!(
                "声明列无一命中表头: {:?}",
                header
            )));
        }

        Ok((ColumnMap { indices }, missing))
    }

    /// 声明列的表头位置
    pub fn position(&self, col: &str) -> Option<usize> {
        self.indices.get(col).copied()
    }

    /// 从数据行取出声明列的原始单元格
    ///
    /// # 返回
    /// - Some(&str): 列已定位且行内存在该位置
    /// - None: 列未定位,或行比表头短
    pub fn retrieve<'a>(&self, col: &str, row: &'a [String]) -> Option<&'a str> {
        let index = self.position(col)?;
        row.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
