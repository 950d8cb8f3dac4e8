// ==========================================
// 商品目录生成系统 - 解析错误类型
// ==========================================
// 错误分级: 模式错误/行错误/引用错误/完整性错误 → 记录后继续
//           致命错误 → 中止整个解析
// 工具: thiserror 派生宏
// ==========================================

use crate::registry::DuplicateKeyError;
use thiserror::Error;

/// 解析错误类型
#[derive(Error, Debug)]
pub enum ParseError {
    // ===== 文件相关错误（致命） =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 表头错误 =====
    #[error("表头不可用: {0}")]
    HeaderUnusable(String),

    #[error("声明列在表头中缺失: {column}")]
    ColumnMissing { column: String },

    // ===== 行级错误 =====
    #[error("行处理失败 (行 {row}): {message}")]
    RowError { row: usize, message: String },

    #[error("日期格式错误 (行 {row}, 字段 {field}): 期望 DD/MM/YYYY，实际 {value}")]
    DateFormatError {
        row: usize,
        field: String,
        value: String,
    },

    // ===== 引用错误 =====
    #[error("引用解析失败 (行 {row}): {message}")]
    ReferenceError { row: usize, message: String },

    // ===== 完整性错误 =====
    #[error("数据完整性违规 (行 {row}): {message}")]
    IntegrityError { row: usize, message: String },

    // ===== 登记冲突 =====
    #[error(transparent)]
    DuplicateKey(#[from] DuplicateKeyError),

    // ===== 配置错误 =====
    #[error("配置无效 (key: {key}): {message}")]
    ConfigError { key: String, message: String },

    // ===== strict 模式 =====
    #[error("strict 模式: 解析累积错误 (行 {row}): {message}")]
    StrictModeViolation { row: usize, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        ParseError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ParseError {
    fn from(err: calamine::Error) -> Self {
        ParseError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::RowError {
            row: 0,
            message: format!("JSON 解析失败: {}", err),
        }
    }
}

/// Result 类型别名
pub type ParseResult<T> = Result<T, ParseError>;
