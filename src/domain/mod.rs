// ==========================================
// 商品目录生成系统 - 领域层
// ==========================================
// 职责: 实体与类型定义,不含解析/规则逻辑
// ==========================================

pub mod node;
pub mod rule;
pub mod special;
pub mod types;

// 重导出领域实体
pub use node::{AttributeEntry, Node, NodeArena, NodeId, NodeKind};
pub use rule::DynamicRule;
pub use special::{Discount, SpecialRule};
pub use types::{DynKind, PriceTier, ProdType};
