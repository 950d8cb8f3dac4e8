// ==========================================
// 商品目录生成系统 - 解析配置
// ==========================================
// 职责: 一次解析会话的模式/列/默认值配置
// 存储: JSON 文件或调用方构造
// ==========================================

use crate::importer::error::{ParseError, ParseResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 解析配置（持久化对象）
///
/// 深度列配置: 类目深度列在前,条目深度列在后;
/// 行深度 = 唯一非空深度列在该序列中的位置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// 模式标签（如 TT/VT,进入日志与来源字段）
    #[serde(default = "default_schema")]
    pub schema: String,

    /// 类目深度列名,长度即类目层数
    pub taxo_columns: Vec<String>,

    /// 条目深度列名,长度即条目层数
    pub item_columns: Vec<String>,

    /// 额外声明的数据列（标准列之外）
    #[serde(default)]
    pub extra_columns: Vec<String>,

    /// 列默认值（单元格为空时回退）
    #[serde(default = "default_defaults")]
    pub defaults: BTreeMap<String, String>,

    /// 数据来源标签（强制字段 source 的取值）
    #[serde(default)]
    pub source: Option<String>,

    /// strict 模式: 解析完成后若有累积错误,将首个错误升级为致命错误
    #[serde(default)]
    pub strict: bool,
}

fn default_schema() -> String {
    "TT".to_string()
}

fn default_defaults() -> BTreeMap<String, String> {
    let mut defaults = BTreeMap::new();
    defaults.insert("post_status".to_string(), "publish".to_string());
    defaults
}

/// 标准声明列（深度列之外,所有目录解析共用）
const STANDARD_COLUMNS: &[&str] = &[
    "CODE",
    "itemtype",
    "SCHEDULE",
    "DYNCAT",
    "DYNPROD",
    "PA",
    "VA",
    "Images",
    "HTML Description",
    "post_status",
    "weight",
    "length",
    "width",
    "height",
    "stock",
    "stock_status",
    // 六档原价列
    "RNR",
    "RPR",
    "WNR",
    "WPR",
    "DNR",
    "DPR",
];

impl ParseConfig {
    /// 以深度列构造最小可用配置
    pub fn new(taxo_columns: Vec<String>, item_columns: Vec<String>) -> Self {
        Self {
            schema: default_schema(),
            taxo_columns,
            item_columns,
            extra_columns: Vec::new(),
            defaults: default_defaults(),
            source: None,
            strict: false,
        }
    }

    /// 从 JSON 文件载入并校验
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ParseError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: ParseConfig =
            serde_json::from_str(&content).map_err(|e| ParseError::ConfigError {
                key: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置有效性
    ///
    /// # 校验规则
    /// 1. 类目/条目深度列都至少一列
    /// 2. 深度列名不得为空、不得重复
    pub fn validate(&self) -> ParseResult<()> {
        if self.taxo_columns.is_empty() {
            return Err(ParseError::ConfigError {
                key: "taxo_columns".to_string(),
                message: "类目深度列不能为空".to_string(),
            });
        }
        if self.item_columns.is_empty() {
            return Err(ParseError::ConfigError {
                key: "item_columns".to_string(),
                message: "条目深度列不能为空".to_string(),
            });
        }

        let mut seen = std::collections::BTreeSet::new();
        for col in self.depth_columns() {
            if col.trim().is_empty() {
                return Err(ParseError::ConfigError {
                    key: "depth_columns".to_string(),
                    message: "深度列名不能为空白".to_string(),
                });
            }
            if !seen.insert(col.clone()) {
                return Err(ParseError::ConfigError {
                    key: "depth_columns".to_string(),
                    message: format!("深度列名重复: {}", col),
                });
            }
        }
        Ok(())
    }

    /// 类目层数
    pub fn taxo_depth(&self) -> usize {
        self.taxo_columns.len()
    }

    /// 最大深度（类目层数 + 条目层数）
    pub fn max_depth(&self) -> usize {
        self.taxo_columns.len() + self.item_columns.len()
    }

    /// 深度列全序列（类目列在前,条目列在后）
    pub fn depth_columns(&self) -> impl Iterator<Item = &String> {
        self.taxo_columns.iter().chain(self.item_columns.iter())
    }

    /// 全部声明列: 深度列 + 标准列 + 额外列（顺序稳定,去重）
    pub fn declared_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let push_unique = |col: String, columns: &mut Vec<String>| {
            if !columns.contains(&col) {
                columns.push(col);
            }
        };

        for col in self.depth_columns() {
            push_unique(col.clone(), &mut columns);
        }
        for col in STANDARD_COLUMNS {
            push_unique(col.to_string(), &mut columns);
        }
        for col in &self.extra_columns {
            push_unique(col.clone(), &mut columns);
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn two_by_two() -> ParseConfig {
        ParseConfig::new(
            vec!["Cat1".to_string(), "Cat2".to_string()],
            vec!["Item1".to_string(), "Item2".to_string()],
        )
    }

    #[test]
    fn test_depth_columns_order() {
        let config = two_by_two();
        let depth: Vec<&String> = config.depth_columns().collect();
        assert_eq!(depth, vec!["Cat1", "Cat2", "Item1", "Item2"]);
        assert_eq!(config.taxo_depth(), 2);
        assert_eq!(config.max_depth(), 4);
    }

    #[test]
    fn test_declared_columns_contains_standards() {
        let config = two_by_two();
        let declared = config.declared_columns();
        assert!(declared.contains(&"CODE".to_string()));
        assert!(declared.contains(&"SCHEDULE".to_string()));
        assert!(declared.contains(&"RNR".to_string()));
        // 深度列在最前
        assert_eq!(declared[0], "Cat1");
    }

    #[test]
    fn test_validate_rejects_duplicate_depth_columns() {
        let config = ParseConfig::new(
            vec!["A".to_string()],
            vec!["A".to_string()],
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_depth_columns() {
        let config = ParseConfig::new(vec![], vec!["Item1".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{
                "schema": "VT",
                "taxo_columns": ["Cat1", "Cat2"],
                "item_columns": ["Item1"],
                "source": "master",
                "strict": true
            }}"#
        )
        .unwrap();

        let config = ParseConfig::from_json_file(temp_file.path()).unwrap();
        assert_eq!(config.schema, "VT");
        assert_eq!(config.taxo_depth(), 2);
        assert!(config.strict);
        // serde 默认值生效
        assert_eq!(
            config.defaults.get("post_status"),
            Some(&"publish".to_string())
        );
    }
}
