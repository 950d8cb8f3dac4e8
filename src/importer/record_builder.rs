// ==========================================
// 商品目录生成系统 - 导入记录构建器
// ==========================================
// 职责: 数据行 → 类型化导入记录
// 规则: 声明列取值 → 非空用清洗值,空用默认值,再无则省略
//       强制字段（source）无条件追加
// ==========================================

use crate::importer::column_map::{sanitize_cell, ColumnMap};
use std::collections::BTreeMap;
use tracing::trace;

// ==========================================
// ImportRecord - 导入记录
// ==========================================
// 一个物理行一条记录;rowcount 为 1 起的物理行号,
// 全解析唯一且单调递增,作为缺省身份与排序决胜键
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub rowcount: usize,
    /// 原始行,供诊断
    pub row: Vec<String>,
    /// 声明列数据（含默认值与强制字段）
    pub fields: BTreeMap<String, String>,
}

impl ImportRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// 缺省身份 = 行号;子类型（如促销规则）覆盖为声明 ID
    pub fn index(&self) -> usize {
        self.rowcount
    }
}

// ==========================================
// RecordBuilder - 记录构建器
// ==========================================
pub struct RecordBuilder<'a> {
    columns: &'a [String],
    defaults: &'a BTreeMap<String, String>,
    map: &'a ColumnMap,
    source: Option<&'a str>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(
        columns: &'a [String],
        defaults: &'a BTreeMap<String, String>,
        map: &'a ColumnMap,
        source: Option<&'a str>,
    ) -> Self {
        Self {
            columns,
            defaults,
            map,
            source,
        }
    }

    /// 构建一条导入记录
    ///
    /// # 规则
    /// 1. 每个声明列: 行内取值非空 → 清洗后存入
    /// 2. 否则有默认值 → 存默认值
    /// 3. 否则省略该字段
    /// 4. 强制字段 source 无条件追加
    ///
    /// # 参数
    /// - rowcount: 1 起物理行号
    /// - row: 数据行
    pub fn build(&self, rowcount: usize, row: &[String]) -> ImportRecord {
        let mut fields = BTreeMap::new();

        for col in self.columns {
            let retrieved = self
                .map
                .retrieve(col, row)
                .map(sanitize_cell)
                .filter(|cell| !cell.is_empty());

            match retrieved {
                Some(value) => {
                    fields.insert(col.clone(), value);
                }
                None => {
                    if let Some(default) = self.defaults.get(col) {
                        fields.insert(col.clone(), default.clone());
                    }
                }
            }
        }

        // 强制字段
        if let Some(source) = self.source {
            fields.insert("source".to_string(), source.to_string());
        }

        trace!(rowcount, field_count = fields.len(), "导入记录构建完成");

        ImportRecord {
            rowcount,
            row: row.to_vec(),
            fields,
        }
    }
}

/// 行是否完全空白（空白行跳过,不产生记录）
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}
