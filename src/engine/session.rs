// ==========================================
// 商品目录生成系统 - 解析会话
// ==========================================
// 职责: 驱动 表头分析 → 逐行摄取+层级构建 → 全图后处理,
//       并持有一次解析的全部登记表
// 红线: 所有登记表作用域限定在单次会话,解析间不共享状态
// 红线: 单线程顺序处理;行顺序即大纲顺序（硬前置条件）
// ==========================================

use crate::config::ParseConfig;
use crate::domain::node::{Node, NodeArena, NodeId, NodeKind};
use crate::domain::rule::DynamicRule;
use crate::domain::special::SpecialRule;
use crate::domain::types::DynKind;
use crate::engine::attributes::AttributeAggregator;
use crate::engine::dynamic_rules::DynamicRuleEngine;
use crate::engine::hierarchy::HierarchyBuilder;
use crate::engine::images::{find_all_images, ImageProcessor};
use crate::engine::specials::{find_all_tokens, SpecialsEngine};
use crate::importer::column_map::ColumnMap;
use crate::importer::error::{ParseError, ParseResult};
use crate::importer::record_builder::{is_blank_row, ImportRecord, RecordBuilder};
use crate::importer::row_source::RowSource;
use crate::registry::{ConflictPolicy, MultiRegistry, Registry};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// ParseSummary - 解析汇总
// ==========================================
#[derive(Debug, Clone)]
pub struct ParseSummary {
    pub batch_id: Uuid,
    pub schema: String,
    pub total_rows: usize,     // 已消费物理行数（含表头与空白行）
    pub records_created: usize,
    pub rows_dropped: usize,   // 行级错误丢弃数
    pub categories: usize,
    pub products: usize,
    pub variations: usize,
    pub error_rows: usize,     // 有错误的行/节点数
    pub error_total: usize,    // 错误总条数
}

// ==========================================
// ParseSession - 解析会话
// ==========================================
pub struct ParseSession {
    config: ParseConfig,
    pub batch_id: Uuid,

    // ===== 树与构建状态 =====
    pub arena: NodeArena,
    builder: HierarchyBuilder,
    column_map: Option<ColumnMap>,
    declared_columns: Vec<String>,
    rowcount: usize,

    // ===== 登记表（按索引 → 记录） =====
    pub objects: Registry<usize, NodeId>,            // 行号 → 节点
    pub categories: Registry<usize, NodeId>,         // 行号 → 分类
    pub categories_by_title: Registry<String, NodeId>, // 全名 → 分类（重名保留首个）
    pub products: Registry<usize, NodeId>,           // 行号 → 一级产品
    pub variations: Registry<String, NodeId>,        // SKU(codesum) → 变体
    pub images: MultiRegistry<String, NodeId>,       // 图片名 → 节点列表
    pub attributes: MultiRegistry<String, String>,   // 属性键 → 值表（去重）

    // ===== 日志（按行号有序） =====
    pub errors: MultiRegistry<usize, String>,
    pub messages: MultiRegistry<usize, String>,

    // ===== 外部规则表（载入后只读） =====
    special_rules: BTreeMap<String, SpecialRule>,
    cat_rules: BTreeMap<String, DynamicRule>,
    prod_rules: BTreeMap<String, DynamicRule>,

    // ===== 汇总计数 =====
    records_created: usize,
    rows_dropped: usize,
}

impl ParseSession {
    /// 创建解析会话（配置校验失败即拒绝）
    pub fn new(config: ParseConfig) -> ParseResult<Self> {
        config.validate()?;
        let declared_columns = config.declared_columns();
        Ok(Self {
            config,
            batch_id: Uuid::new_v4(),
            arena: NodeArena::new(),
            builder: HierarchyBuilder::new(),
            column_map: None,
            declared_columns,
            rowcount: 0,
            objects: Registry::new("objects", ConflictPolicy::Raise),
            categories: Registry::new("categories", ConflictPolicy::Raise),
            categories_by_title: Registry::new("categories_by_title", ConflictPolicy::Ignore),
            products: Registry::new("products", ConflictPolicy::Raise),
            variations: Registry::new("variations", ConflictPolicy::Raise),
            images: MultiRegistry::new("images"),
            attributes: MultiRegistry::new("attributes"),
            errors: MultiRegistry::new("errors"),
            messages: MultiRegistry::new("messages"),
            special_rules: BTreeMap::new(),
            cat_rules: BTreeMap::new(),
            prod_rules: BTreeMap::new(),
            records_created: 0,
            rows_dropped: 0,
        })
    }

    /// 注入促销规则表
    pub fn with_special_rules(mut self, rules: BTreeMap<String, SpecialRule>) -> Self {
        self.special_rules = rules;
        self
    }

    /// 注入分类动态规则表（DYNCAT 引用）
    pub fn with_category_rules(mut self, rules: BTreeMap<String, DynamicRule>) -> Self {
        self.cat_rules = rules;
        self
    }

    /// 注入产品动态规则表（DYNPROD 引用）
    pub fn with_product_rules(mut self, rules: BTreeMap<String, DynamicRule>) -> Self {
        self.prod_rules = rules;
        self
    }

    // ==========================================
    // 主流程
    // ==========================================

    /// 解析一个行来源并完成全部后处理
    ///
    /// # 流程
    /// 1. 读取全部行（行 0 起为物理行序）
    /// 2. 第一个非空行为表头 → 列映射
    /// 3. 逐行: 空白跳过 / 构建记录 / 层级挂载 / 索引登记
    /// 4. 全图后处理: 动态规则 → 分类摘要 → 图片 → 属性 → 促销
    /// 5. strict 模式: 有累积错误则升级首个错误
    pub fn analyse(
        &mut self,
        source: &dyn RowSource,
        now: DateTime<Utc>,
    ) -> ParseResult<ParseSummary> {
        info!(
            batch_id = %self.batch_id,
            schema = %self.config.schema,
            source = %source.name(),
            "开始解析"
        );
        let rows = source.read_rows()?;
        self.analyse_rows(rows, now)
    }

    /// 解析内存中的行网格（API 分页等来源直接转交）
    pub fn analyse_rows(
        &mut self,
        rows: Vec<Vec<String>>,
        now: DateTime<Utc>,
    ) -> ParseResult<ParseSummary> {
        for row in rows {
            self.rowcount += 1;

            // 空白行: 不产生记录,行号照常推进
            if is_blank_row(&row) {
                continue;
            }

            // 第一个非空行为表头
            let map = match self.column_map.as_ref() {
                Some(map) => map,
                None => {
                    self.analyse_header(&row)?;
                    continue;
                }
            };

            let builder = RecordBuilder::new(
                &self.declared_columns,
                &self.config.defaults,
                map,
                self.config.source.as_deref(),
            );
            let record = builder.build(self.rowcount, &row);
            self.process_record(record);
        }

        self.post_process(now);

        let summary = self.summary();
        info!(
            batch_id = %self.batch_id,
            records = summary.records_created,
            categories = summary.categories,
            products = summary.products,
            variations = summary.variations,
            errors = summary.error_total,
            "解析完成"
        );

        // strict 模式: 首个累积错误升级为致命错误
        if self.config.strict {
            if let Some((row, message)) = self.errors.first() {
                return Err(ParseError::StrictModeViolation {
                    row: *row,
                    message: message.clone(),
                });
            }
        }

        Ok(summary)
    }

    /// 表头分析: 声明列缺失记模式错误,完全无法匹配则致命
    fn analyse_header(&mut self, row: &[String]) -> ParseResult<()> {
        let (map, missing) = ColumnMap::analyze_header(&self.declared_columns, row)?;
        for col in missing {
            warn!(column = %col, "声明列在表头中缺失");
            self.errors
                .append(self.rowcount, format!("声明列在表头中缺失: {}", col));
        }
        self.column_map = Some(map);
        Ok(())
    }

    // ==========================================
    // 单行处理
    // ==========================================

    fn process_record(&mut self, record: ImportRecord) {
        let rowcount = record.rowcount;

        // 层级挂载（行错误 → 丢弃该行,继续后续行）
        let placement = match self
            .builder
            .place_row(&mut self.arena, &self.config, record)
        {
            Ok(placement) => placement,
            Err(err) => {
                warn!(rowcount, error = %err, "行丢弃");
                self.errors.append(rowcount, err.to_string());
                self.rows_dropped += 1;
                return;
            }
        };
        self.records_created += 1;

        let id = placement.id;
        self.messages
            .append(rowcount, format!("{} 已创建", self.arena.get(id).identifier()));

        if placement.gapped {
            self.errors.append(
                rowcount,
                format!(
                    "跳层行: 已挂载到最深开放祖先之下 ({})",
                    self.arena.get(id).fullname
                ),
            );
        }

        // 对象登记（行号唯一,冲突即错误）
        if let Err(duplicate) = self.objects.register(rowcount, id) {
            self.errors.append(rowcount, duplicate.to_string());
        }

        match placement.kind {
            NodeKind::Category => {
                if let Err(duplicate) = self.categories.register(rowcount, id) {
                    self.errors.append(rowcount, duplicate.to_string());
                }
                let fullname = self.arena.get(id).fullname.clone();
                // 重名分类保留首个（Ignore 策略,不产生错误）
                let _ = self.categories_by_title.register(fullname, id);
            }
            NodeKind::Item => self.process_item(id, rowcount, &placement),
            // place_row 不产生根节点
            NodeKind::Root => {}
        }

        // 促销计划标记
        if let Some(schedule) = self.arena.get(id).get("SCHEDULE").map(str::to_string) {
            self.arena.get_mut(id).schedule_tokens = find_all_tokens(&schedule);
        }

        // 图片登记
        if let Some(image_field) = self.arena.get(id).get("Images").map(str::to_string) {
            for image in find_all_images(&image_field) {
                ImageProcessor::register(&mut self.arena, &mut self.images, id, &image);
            }
        }
    }

    /// 条目处理: 产品提升 / 分类挂接 / 属性摄取
    fn process_item(
        &mut self,
        id: NodeId,
        rowcount: usize,
        placement: &crate::engine::hierarchy::Placement,
    ) {
        let prod_type = match placement.prod_type {
            Some(prod_type) => prod_type,
            None => return, // 普通条目
        };

        if prod_type.is_first_order() {
            if let Err(duplicate) = self.products.register(rowcount, id) {
                self.errors.append(rowcount, duplicate.to_string());
            }

            // 分类双向挂接（全部类目祖先）
            let cats = self.arena.taxo_ancestors(id);
            for &cat in &cats {
                HierarchyBuilder::join_category(&mut self.arena, cat, id);
            }

            // PA 属性: 所属分类的 PA 在前,自身 PA 在后
            let mut pa_sources: Vec<String> = Vec::new();
            for &cat in &cats {
                if let Some(pa) = self.arena.get(cat).get("PA") {
                    pa_sources.push(pa.to_string());
                }
            }
            if let Some(pa) = self.arena.get(id).get("PA") {
                pa_sources.push(pa.to_string());
            }
            for pa in pa_sources {
                match AttributeAggregator::decode_attribute_map(&pa) {
                    Ok(pairs) => {
                        for (key, value) in pairs {
                            self.register_attribute(id, &key, &value, false);
                        }
                    }
                    Err(message) => self.errors.append(rowcount, message),
                }
            }
        } else {
            // 变体: SKU 登记 + VA 属性双写（父与自身同一次登记）
            let codesum = self.arena.get(id).codesum.clone();
            if let Err(duplicate) = self.variations.register(codesum, id) {
                self.errors.append(rowcount, duplicate.to_string());
            }

            let parent = match placement.variable_parent {
                Some(parent) => parent,
                None => {
                    self.errors.append(
                        rowcount,
                        "内部错误: 变体挂载缺少可变产品父节点".to_string(),
                    );
                    return;
                }
            };

            if let Some(va) = self.arena.get(id).get("VA").map(str::to_string) {
                match AttributeAggregator::decode_attribute_map(&va) {
                    Ok(pairs) => {
                        for (key, value) in pairs {
                            self.register_attribute(parent, &key, &value, true);
                            self.register_attribute(id, &key, &value, true);
                        }
                    }
                    Err(message) => self.errors.append(rowcount, message),
                }
            }
        }
    }

    /// 属性登记: 节点聚合 + 会话级属性值索引
    fn register_attribute(&mut self, node_id: NodeId, key: &str, value: &str, as_variation: bool) {
        if key.trim().is_empty() {
            let rowcount = self.arena.get(node_id).rowcount;
            self.errors
                .append(rowcount, "属性键不能为空".to_string());
            return;
        }
        AttributeAggregator::register(self.arena.get_mut(node_id), key, value, as_variation);
        self.attributes
            .append_unique(key.to_string(), value.to_string());
    }

    // ==========================================
    // 全图后处理
    // ==========================================

    /// 后处理各遍只读祖先链、只写自身字段,
    /// 逐节点按行序执行
    fn post_process(&mut self, now: DateTime<Utc>) {
        let ids: Vec<NodeId> = self.arena.node_ids().collect();
        debug!(nodes = ids.len(), "开始全图后处理");

        for id in ids {
            self.post_process_dynamic_rules(id);
            self.post_process_categories(id);
            self.post_process_images(id);
            self.post_process_attributes(id);
            self.post_process_specials(id, now);
        }
    }

    /// 动态规则注入
    ///
    /// # 来源
    /// - 分类规则（DYNCAT）: 祖先分类链,自身是分类时含自身
    /// - 产品规则（DYNPROD）: 节点自身数据
    fn post_process_dynamic_rules(&mut self, id: NodeId) {
        let rowcount = self.arena.get(id).rowcount;

        for kind in [DynKind::Category, DynKind::Product] {
            let mut lists: Vec<String> = Vec::new();
            match kind {
                DynKind::Category => {
                    let chain = self.arena.taxo_ancestors(id);
                    for cat in chain {
                        if let Some(list) = self.arena.get(cat).get(kind.column()) {
                            lists.push(list.to_string());
                        }
                    }
                    if self.arena.get(id).is_category() {
                        if let Some(list) = self.arena.get(id).get(kind.column()) {
                            lists.push(list.to_string());
                        }
                    }
                }
                DynKind::Product => {
                    if let Some(list) = self.arena.get(id).get(kind.column()) {
                        lists.push(list.to_string());
                    }
                }
            }

            let rules = match kind {
                DynKind::Category => &self.cat_rules,
                DynKind::Product => &self.prod_rules,
            };
            let errors = DynamicRuleEngine::apply(self.arena.get_mut(id), kind, &lists, rules);
            for error in errors {
                self.errors.append(rowcount, error);
            }
        }
    }

    /// 分类摘要: 产品的 catsum = 所属分类全名管道连接
    fn post_process_categories(&mut self, id: NodeId) {
        let node = self.arena.get(id);
        if !node.is_product() || node.is_variation() {
            return;
        }
        let catsum = node
            .member_categories
            .iter()
            .map(|&cat| self.arena.get(cat).fullname.clone())
            .filter(|fullname| !fullname.is_empty())
            .collect::<Vec<_>>()
            .join("|");
        self.arena.get_mut(id).set("catsum", catsum);
    }

    fn post_process_images(&mut self, id: NodeId) {
        let rowcount = self.arena.get(id).rowcount;
        if let Some(error) = ImageProcessor::render(&mut self.arena, id) {
            self.errors.append(rowcount, error);
        }
    }

    fn post_process_attributes(&mut self, id: NodeId) {
        let rowcount = self.arena.get(id).rowcount;
        for error in AttributeAggregator::render(self.arena.get_mut(id)) {
            self.errors.append(rowcount, error);
        }
    }

    /// 促销调度: 标记继承（自身 + 所属分类 + 变体的父产品）后应用规则
    ///
    /// 继承列表按链序拼接、不去重,同档位后者覆盖前者;
    /// 父产品先于变体处理（行序保证）,变体读到的是父产品扩展后的列表
    fn post_process_specials(&mut self, id: NodeId, now: DateTime<Utc>) {
        if !self.arena.get(id).is_product() {
            return;
        }
        let rowcount = self.arena.get(id).rowcount;

        let mut tokens = self.arena.get(id).schedule_tokens.clone();
        let cats = self.arena.get(id).member_categories.clone();
        for cat in cats {
            tokens.extend(self.arena.get(cat).schedule_tokens.iter().cloned());
        }
        if let Some(parent) = self.arena.get(id).parent_product {
            tokens.extend(self.arena.get(parent).schedule_tokens.iter().cloned());
        }

        {
            let node = self.arena.get_mut(id);
            node.schedule_tokens = tokens.clone();
            let spsum = tokens.join("|");
            node.set("spsum", spsum);
        }

        let errors =
            SpecialsEngine::apply(self.arena.get_mut(id), &tokens, &self.special_rules, now);
        for error in errors {
            self.errors.append(rowcount, error);
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    pub fn root(&self) -> &Node {
        self.arena.get(NodeArena::ROOT)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    /// 按 codesum 查找节点（测试与下游匹配阶段使用）
    pub fn find_by_codesum(&self, codesum: &str) -> Option<&Node> {
        self.arena
            .node_ids()
            .map(|id| self.arena.get(id))
            .find(|node| node.codesum == codesum)
    }

    /// 解析是否带错误完成（调用方决定是否继续下游同步/导出）
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn summary(&self) -> ParseSummary {
        ParseSummary {
            batch_id: self.batch_id,
            schema: self.config.schema.clone(),
            total_rows: self.rowcount,
            records_created: self.records_created,
            rows_dropped: self.rows_dropped,
            categories: self.categories.len(),
            products: self.products.len(),
            variations: self.variations.len(),
            error_rows: self.errors.len(),
            error_total: self.errors.total(),
        }
    }
}
