// ==========================================
// 商品目录生成系统 - 引擎层
// ==========================================
// 职责: 实现解析与富集业务规则
// 红线: 引擎无跨会话状态,登记表由解析会话持有
// ==========================================

pub mod attributes;
pub mod dynamic_rules;
pub mod hierarchy;
pub mod images;
pub mod session;
pub mod specials;

// 重导出核心引擎
pub use attributes::AttributeAggregator;
pub use dynamic_rules::DynamicRuleEngine;
pub use hierarchy::{HierarchyBuilder, Placement};
pub use images::{find_all_images, ImageProcessor};
pub use session::{ParseSession, ParseSummary};
pub use specials::{find_all_tokens, SpecialsEngine};
