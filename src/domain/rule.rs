// ==========================================
// 商品目录生成系统 - 动态规则领域模型
// ==========================================
// 外部定义的分类/产品定价规则,按 ID 注入节点
// 红线: 载入后不可变
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// DynamicRule - 动态规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRule {
    /// 规则 ID（被 DYNCAT/DYNPROD 列表引用）
    pub id: String,
    /// 注入节点规则摘要的 HTML 片段
    pub html: String,
}

impl DynamicRule {
    pub fn new(id: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            html: html.into(),
        }
    }

    /// 渲染为摘要片段
    pub fn to_html(&self) -> &str {
        &self.html
    }
}
