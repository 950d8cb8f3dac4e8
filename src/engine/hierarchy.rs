// ==========================================
// 商品目录生成系统 - 层级构建引擎
// ==========================================
// 职责: 深度编码行序列 → 父子树重建
// 算法: 按深度索引的祖先栈,逐行截断-挂载-入栈
// 红线: 行必须按原始大纲顺序输入（硬前置条件,乱序即重建错误）
// ==========================================

use crate::config::ParseConfig;
use crate::domain::node::{NodeArena, NodeId, NodeKind};
use crate::domain::types::ProdType;
use crate::importer::error::{ParseError, ParseResult};
use crate::importer::record_builder::ImportRecord;
use tracing::{debug, warn};

// ==========================================
// Placement - 单行挂载结果
// ==========================================
#[derive(Debug)]
pub struct Placement {
    pub id: NodeId,
    pub kind: NodeKind,
    pub prod_type: Option<ProdType>,
    /// 行深度列超出当前开放祖先层数（跳层行,已降级挂载）
    pub gapped: bool,
    /// 变体挂载的可变产品（仅变体行）
    pub variable_parent: Option<NodeId>,
}

// ==========================================
// HierarchyBuilder - 层级构建引擎
// ==========================================
// 状态: 祖先栈 stack[d] = 深度 d 处最近出现的节点;
// 栈归属单次解析会话,解析间不共享
pub struct HierarchyBuilder {
    stack: Vec<NodeId>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// 当前开放祖先层数
    pub fn open_depth(&self) -> usize {
        self.stack.len()
    }

    /// 识别行深度: 深度列序列（类目列在前,条目列在后）中
    /// 第一个非空列的位置与其中的名称
    ///
    /// # 返回
    /// - Some((depth, name)): 命中
    /// - None: 所有深度列皆空（非节点行）
    pub fn detect_depth(config: &ParseConfig, record: &ImportRecord) -> Option<(usize, String)> {
        for (depth, col) in config.depth_columns().enumerate() {
            if let Some(name) = record.get(col) {
                if !name.is_empty() {
                    return Some((depth, name.to_string()));
                }
            }
        }
        None
    }

    /// 将一行挂载进树
    ///
    /// # 算法
    /// 1. 识别深度与名称（无深度列命中 → 行错误）
    /// 2. 跳层行降级: 有效深度 = min(行深度, 开放层数),并标记 gapped
    /// 3. 截断栈至有效深度,父节点 = 栈顶（或根）
    /// 4. 变体行预检: 父节点必须是可变产品,否则行错误（不分配节点）
    /// 5. 分配节点,计算 codesum/fullname,入栈
    /// 6. 变体行原子双向挂接（变体.父引用 与 父.变体表 同一操作内更新）
    ///
    /// # 返回
    /// - Ok(Placement): 挂载结果
    /// - Err(RowError): 该行丢弃,栈不变
    pub fn place_row(
        &mut self,
        arena: &mut NodeArena,
        config: &ParseConfig,
        record: ImportRecord,
    ) -> ParseResult<Placement> {
        let rowcount = record.rowcount;

        // 1. 深度识别
        let (raw_depth, name) =
            Self::detect_depth(config, &record).ok_or_else(|| ParseError::RowError {
                row: rowcount,
                message: "未命中任何深度列,无法定位层级".to_string(),
            })?;

        let kind = if raw_depth < config.taxo_depth() {
            NodeKind::Category
        } else {
            NodeKind::Item
        };

        // 2. 跳层降级
        let gapped = raw_depth > self.stack.len();
        let depth = raw_depth.min(self.stack.len());
        if gapped {
            warn!(
                rowcount,
                raw_depth,
                effective_depth = depth,
                "跳层行: 深度超出开放祖先,挂载到最深开放祖先之下"
            );
        }

        // 3. 父节点定位（栈尚未截断,先看目标位置）
        let parent = if depth == 0 {
            NodeArena::ROOT
        } else {
            self.stack[depth - 1]
        };

        // 4. 产品形态识别与变体预检
        let prod_type = if kind == NodeKind::Item {
            record.get("itemtype").and_then(ProdType::from_code)
        } else {
            None
        };

        if prod_type == Some(ProdType::Variation) && !arena.get(parent).is_variable() {
            return Err(ParseError::RowError {
                row: rowcount,
                message: format!(
                    "变体行找不到可变产品祖先（实际父节点: {}）",
                    arena.get(parent).identifier()
                ),
            });
        }

        // 5. 分配与累计字段
        self.stack.truncate(depth);

        let code = record.get("CODE").unwrap_or("").to_string();
        let source = record.get("source").map(str::to_string);
        let ImportRecord { row, fields, .. } = record;

        let id = arena.alloc(
            kind, depth, parent, rowcount, row, source, name, code, fields,
        );

        let codesum = arena.join_ancestry(id, |n| &n.code, "-");
        let fullname = arena.join_ancestry(id, |n| &n.name, " > ");
        {
            let node = arena.get_mut(id);
            node.codesum = codesum;
            node.fullname = fullname;
            node.prod_type = prod_type;
        }

        self.stack.push(id);

        // 6. 变体双向挂接（原子: 两侧在同一操作内完成）
        let variable_parent = if prod_type == Some(ProdType::Variation) {
            Self::join_variation(arena, parent, id);
            Some(parent)
        } else {
            None
        };

        debug!(
            rowcount,
            depth,
            codesum = %arena.get(id).codesum,
            kind = ?kind,
            "节点挂载完成"
        );

        Ok(Placement {
            id,
            kind,
            prod_type,
            gapped,
            variable_parent,
        })
    }

    /// 变体与可变产品的双向挂接
    ///
    /// 前置: parent 已验证为可变产品
    fn join_variation(arena: &mut NodeArena, parent: NodeId, variation: NodeId) {
        let (var_codesum, parent_codesum) = (
            arena.get(variation).codesum.clone(),
            arena.get(parent).codesum.clone(),
        );
        {
            let var_node = arena.get_mut(variation);
            var_node.parent_product = Some(parent);
            var_node.parent_sku = Some(parent_codesum);
        }
        arena
            .get_mut(parent)
            .variations
            .insert(var_codesum, variation);
    }

    /// 产品与分类的双向挂接（成员登记,按身份去重）
    pub fn join_category(arena: &mut NodeArena, category: NodeId, product: NodeId) {
        {
            let product_node = arena.get_mut(product);
            if !product_node.member_categories.contains(&category) {
                product_node.member_categories.push(category);
            }
        }
        let category_node = arena.get_mut(category);
        if !category_node.members.contains(&product) {
            category_node.members.push(product);
        }
    }
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
