// ==========================================
// 商品目录生成系统 - 导入层
// ==========================================
// 职责: 外部行数据 → 类型化导入记录
// 支持: Excel, CSV, 内存行
// ==========================================

// 模块声明
pub mod column_map;
pub mod error;
pub mod record_builder;
pub mod row_source;

// 重导出核心类型
pub use column_map::{sanitize_cell, ColumnMap};
pub use error::{ParseError, ParseResult};
pub use record_builder::{is_blank_row, ImportRecord, RecordBuilder};
pub use row_source::{CsvRowSource, ExcelRowSource, RowSource, UniversalRowSource, VecRowSource};
