// ==========================================
// 商品目录生成系统 - 树节点领域模型
// ==========================================
// 红线: 父引用不拥有生命周期,节点全部归属 NodeArena
// 用途: 层级构建引擎写入,后处理引擎读写,下游只读
// ==========================================

use crate::domain::types::ProdType;
use std::collections::BTreeMap;

/// 节点在 NodeArena 中的下标,整个解析会话内稳定
pub type NodeId = usize;

// ==========================================
// NodeKind - 节点种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,     // 哨兵根节点,不对应任何数据行
    Category, // 分类（类目深度列命中）
    Item,     // 条目（条目深度列命中,可被提升为产品）
}

// ==========================================
// AttributeEntry - 属性聚合条目
// ==========================================
// 对齐目录导出格式: values|position|visible|variation|default
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeEntry {
    pub key: String,
    pub values: Vec<String>,
    pub position: usize,
    pub visible: bool,
    pub variation: bool,
    pub default: Option<String>,
}

impl AttributeEntry {
    pub fn new(key: String, value: String, position: usize) -> Self {
        Self {
            key,
            values: vec![value],
            position,
            visible: true,
            variation: false,
            default: None,
        }
    }
}

// ==========================================
// Node - 树节点
// ==========================================
// 一个数据行重建为一个节点;rowcount 为行号侧车,全解析唯一
#[derive(Debug, Clone)]
pub struct Node {
    // ===== 行侧车（非数据） =====
    pub id: NodeId,           // 所在 NodeArena 下标
    pub rowcount: usize,      // 原始行号（1 起,单调递增,缺省身份）
    pub row: Vec<String>,     // 原始行,供诊断
    pub source: Option<String>, // 数据来源标签

    // ===== 树结构 =====
    pub kind: NodeKind,
    pub depth: usize,             // 有效树深度,恒等于父深度+1（根除外）
    pub parent: Option<NodeId>,   // 仅根节点为 None
    pub children: Vec<NodeId>,    // 按行序

    // ===== 自身名称与代码 =====
    pub name: String, // 本节点深度列中的显示名
    pub code: String, // 本节点短代码（CODE 列）

    // ===== 祖先链累计字段 =====
    pub codesum: String,  // 根→自身代码连接,空段省略
    pub fullname: String, // 根→自身名称连接,空段省略

    // ===== 产品能力 =====
    pub prod_type: Option<ProdType>, // itemtype 识别结果,None=普通条目
    pub member_categories: Vec<NodeId>, // 产品 → 所属分类（登记序）
    pub members: Vec<NodeId>,           // 分类 → 成员产品（登记序）
    pub variations: BTreeMap<String, NodeId>, // 可变产品 → SKU(codesum)→变体
    pub parent_product: Option<NodeId>,       // 变体 → 可变产品（非拥有引用）
    pub parent_sku: Option<String>,           // 变体 → 可变产品 codesum

    // ===== 后处理富集 =====
    pub images: Vec<String>,          // 图片文件名（登记序,去重）
    pub schedule_tokens: Vec<String>, // 促销计划标记（SCHEDULE 列解析）
    pub attributes: Vec<AttributeEntry>, // 属性聚合（插入序,position 即下标）
    pub cat_rule_ids: Vec<String>,    // 已解析分类规则 ID（按身份去重）
    pub prod_rule_ids: Vec<String>,   // 已解析产品规则 ID（按身份去重）

    // ===== 开放字段 =====
    // 已声明列的透传数据与后处理写入的导出字段
    pub fields: BTreeMap<String, String>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    pub fn is_category(&self) -> bool {
        matches!(self.kind, NodeKind::Category)
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, NodeKind::Item)
    }

    /// 是否为产品（条目 + 识别出的 itemtype）
    pub fn is_product(&self) -> bool {
        self.is_item() && self.prod_type.is_some()
    }

    pub fn is_variable(&self) -> bool {
        self.prod_type == Some(ProdType::Variable)
    }

    pub fn is_variation(&self) -> bool {
        self.prod_type == Some(ProdType::Variation)
    }

    /// 读取开放字段
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// 写入开放字段（后处理阶段覆盖写）
    pub fn set(&mut self, key: &str, value: String) {
        self.fields.insert(key.to_string(), value);
    }

    /// 查找属性条目
    pub fn attribute(&self, key: &str) -> Option<&AttributeEntry> {
        self.attributes.iter().find(|entry| entry.key == key)
    }

    pub fn attribute_mut(&mut self, key: &str) -> Option<&mut AttributeEntry> {
        self.attributes.iter_mut().find(|entry| entry.key == key)
    }

    /// 诊断标识（行号 + 种类）
    pub fn identifier(&self) -> String {
        let kind = match self.kind {
            NodeKind::Root => "Root",
            NodeKind::Category => "Category",
            NodeKind::Item => "Item",
        };
        format!("行 {} <{}>", self.rowcount, kind)
    }
}

// ==========================================
// NodeArena - 节点所有权容器
// ==========================================
// 所有节点归属此处,树关系以 NodeId 表达;
// 每次解析新建一个 Arena,解析间不共享
#[derive(Debug)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    /// 创建 Arena 并放入哨兵根节点（下标 0）
    pub fn new() -> Self {
        let root = Node {
            id: 0,
            rowcount: 0,
            row: Vec::new(),
            source: None,
            kind: NodeKind::Root,
            depth: 0,
            parent: None,
            children: Vec::new(),
            name: String::new(),
            code: String::new(),
            codesum: String::new(),
            fullname: String::new(),
            prod_type: None,
            member_categories: Vec::new(),
            members: Vec::new(),
            variations: BTreeMap::new(),
            parent_product: None,
            parent_sku: None,
            images: Vec::new(),
            schedule_tokens: Vec::new(),
            attributes: Vec::new(),
            cat_rule_ids: Vec::new(),
            prod_rule_ids: Vec::new(),
            fields: BTreeMap::new(),
        };
        Self { nodes: vec![root] }
    }

    pub const ROOT: NodeId = 0;

    /// 分配新节点并挂到父节点之下
    ///
    /// # 参数
    /// - kind/depth/parent: 树位置（depth 必须等于父深度+1,根的子节点为 1）
    /// - name/code: 本节点自身名称与代码
    ///
    /// # 返回
    /// 新节点 ID;父节点 children 已追加
    #[allow(clippy::too_many_arguments)]
    pub fn alloc(
        &mut self,
        kind: NodeKind,
        depth: usize,
        parent: NodeId,
        rowcount: usize,
        row: Vec<String>,
        source: Option<String>,
        name: String,
        code: String,
        fields: BTreeMap<String, String>,
    ) -> NodeId {
        let id = self.nodes.len();
        let node = Node {
            id,
            rowcount,
            row,
            source,
            kind,
            depth,
            parent: Some(parent),
            children: Vec::new(),
            name,
            code,
            codesum: String::new(),
            fullname: String::new(),
            prod_type: None,
            member_categories: Vec::new(),
            members: Vec::new(),
            variations: BTreeMap::new(),
            parent_product: None,
            parent_sku: None,
            images: Vec::new(),
            schedule_tokens: Vec::new(),
            attributes: Vec::new(),
            cat_rule_ids: Vec::new(),
            prod_rule_ids: Vec::new(),
            fields,
        };
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// 祖先链（根之后的第一层 → 父）,不含根与自身
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes[id].parent;
        while let Some(pid) = cursor {
            if pid == Self::ROOT {
                break;
            }
            chain.push(pid);
            cursor = self.nodes[pid].parent;
        }
        chain.reverse();
        chain
    }

    /// 祖先链中的分类节点（根→父方向）
    pub fn taxo_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.ancestors(id)
            .into_iter()
            .filter(|&aid| self.nodes[aid].is_category())
            .collect()
    }

    /// 沿祖先链连接字段,空段省略
    ///
    /// # 参数
    /// - segment: 各节点取段函数（如 |n| &n.code）
    /// - delimiter: 连接符
    pub fn join_ancestry<'a, F>(&'a self, id: NodeId, segment: F, delimiter: &str) -> String
    where
        F: Fn(&'a Node) -> &'a str,
    {
        let mut parts: Vec<&str> = Vec::new();
        for aid in self.ancestors(id) {
            let part = segment(&self.nodes[aid]);
            if !part.is_empty() {
                parts.push(part);
            }
        }
        let own = segment(&self.nodes[id]);
        if !own.is_empty() {
            parts.push(own);
        }
        parts.join(delimiter)
    }

    /// 全部非根节点 ID,按行序（即分配序）
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        1..self.nodes.len()
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}
