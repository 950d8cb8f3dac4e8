// ==========================================
// 商品目录生成系统 - 核心库
// ==========================================
// 技术栈: Rust + serde + chrono
// 系统定位: 目录数据解析引擎 (下游同步/导出的数据源)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 导入层 - 外部数据
pub mod importer;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 解析配置
pub mod config;

// 注册表 - 通用键值登记
pub mod registry;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DynKind, PriceTier, ProdType};

// 领域实体
pub use domain::{AttributeEntry, Discount, DynamicRule, Node, NodeArena, NodeId, NodeKind, SpecialRule};

// 注册表
pub use registry::{ConflictPolicy, DuplicateKeyError, MultiRegistry, Registry};

// 导入层
pub use importer::{
    ColumnMap, CsvRowSource, ExcelRowSource, ImportRecord, ParseError, ParseResult,
    RecordBuilder, RowSource, UniversalRowSource, VecRowSource,
};

// 引擎
pub use engine::{
    AttributeAggregator, DynamicRuleEngine, HierarchyBuilder, ImageProcessor, ParseSession,
    ParseSummary, SpecialsEngine,
};

// 配置
pub use config::ParseConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "商品目录生成系统";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
