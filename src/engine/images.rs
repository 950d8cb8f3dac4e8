// ==========================================
// 商品目录生成系统 - 图片登记引擎
// ==========================================
// 职责: Images 列 → 图片文件名提取、节点与会话双登记、
//       向无图祖先共享、imgsum 渲染
// 注: 图片文件本身的缩放/元数据由外部协作方处理,此处只登记名称
// ==========================================

use crate::domain::node::{NodeArena, NodeId};
use crate::registry::MultiRegistry;
use tracing::debug;

/// 提取图片文件名（管道/空白分隔,必须带扩展名点号）
pub fn find_all_images(image_string: &str) -> Vec<String> {
    image_string
        .split(|c: char| c == '|' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.contains('.'))
        .map(str::to_string)
        .collect()
}

// ==========================================
// ImageProcessor - 图片登记引擎
// ==========================================
pub struct ImageProcessor;

impl ImageProcessor {
    /// 登记一张图片到节点,并沿祖先链向无图祖先共享
    ///
    /// # 规则
    /// 1. 节点图片列表按身份去重
    /// 2. 会话图片索引: 文件名 → 节点列表（列表桶）
    /// 3. 父节点无图 → 同名图片共享给父节点,逐级向上直到
    ///    遇到已有图的祖先或根
    pub fn register(
        arena: &mut NodeArena,
        index: &mut MultiRegistry<String, NodeId>,
        node_id: NodeId,
        image: &str,
    ) {
        {
            let node = arena.get_mut(node_id);
            if node.images.iter().any(|existing| existing == image) {
                return;
            }
            node.images.push(image.to_string());
        }
        index.append_unique(image.to_string(), node_id);
        debug!(image, node_id, "图片登记");

        // 向无图祖先共享
        let mut cursor = arena.get(node_id).parent;
        while let Some(ancestor_id) = cursor {
            let ancestor = arena.get_mut(ancestor_id);
            if ancestor.is_root() || !ancestor.images.is_empty() {
                break;
            }
            ancestor.images.push(image.to_string());
            cursor = arena.get(ancestor_id).parent;
        }
    }

    /// 渲染 imgsum 字段并检查产品配图完整性
    ///
    /// # 返回
    /// - Some(String): 完整性错误（产品无图）
    /// - None: 正常
    pub fn render(arena: &mut NodeArena, node_id: NodeId) -> Option<String> {
        let node = arena.get_mut(node_id);
        let imgsum = node.images.join("|");
        node.set("imgsum", imgsum.clone());

        if node.is_product() && !node.is_variation() && imgsum.is_empty() {
            return Some(format!("产品 {} 没有任何图片", node.codesum));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::NodeKind;
    use crate::domain::types::ProdType;
    use std::collections::BTreeMap;

    fn alloc(arena: &mut NodeArena, kind: NodeKind, depth: usize, parent: NodeId, row: usize) -> NodeId {
        arena.alloc(
            kind,
            depth,
            parent,
            row,
            Vec::new(),
            None,
            format!("节点{}", row),
            format!("C{}", row),
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_find_all_images() {
        assert_eq!(
            find_all_images("front.jpg|back.png  detail.jpg"),
            vec!["front.jpg", "back.png", "detail.jpg"]
        );
        // 无扩展名点号的标记不是文件名
        assert_eq!(find_all_images("noext | x.gif"), vec!["x.gif"]);
        assert_eq!(find_all_images(""), Vec::<String>::new());
    }

    #[test]
    fn test_register_dedupes_and_indexes() {
        let mut arena = NodeArena::new();
        let mut index: MultiRegistry<String, NodeId> = MultiRegistry::new("images");
        let cat = alloc(&mut arena, NodeKind::Category, 0, NodeArena::ROOT, 2);
        let item = alloc(&mut arena, NodeKind::Item, 1, cat, 3);

        ImageProcessor::register(&mut arena, &mut index, item, "front.jpg");
        ImageProcessor::register(&mut arena, &mut index, item, "front.jpg");

        assert_eq!(arena.get(item).images, vec!["front.jpg"]);
        assert_eq!(index.get(&"front.jpg".to_string()), Some(&[item][..]));
    }

    #[test]
    fn test_register_shares_to_imageless_ancestors() {
        let mut arena = NodeArena::new();
        let mut index: MultiRegistry<String, NodeId> = MultiRegistry::new("images");
        let cat = alloc(&mut arena, NodeKind::Category, 0, NodeArena::ROOT, 2);
        let sub = alloc(&mut arena, NodeKind::Category, 1, cat, 3);
        let item = alloc(&mut arena, NodeKind::Item, 2, sub, 4);

        // 先给 cat 配图,sub 无图
        ImageProcessor::register(&mut arena, &mut index, cat, "cat.jpg");
        ImageProcessor::register(&mut arena, &mut index, item, "item.jpg");

        // sub 无图 → 共享 item.jpg;cat 已有图 → 不覆盖
        assert_eq!(arena.get(sub).images, vec!["item.jpg"]);
        assert_eq!(arena.get(cat).images, vec!["cat.jpg"]);
    }

    #[test]
    fn test_render_imgsum_and_product_integrity() {
        let mut arena = NodeArena::new();
        let mut index: MultiRegistry<String, NodeId> = MultiRegistry::new("images");
        let item = alloc(&mut arena, NodeKind::Item, 0, NodeArena::ROOT, 2);
        arena.get_mut(item).prod_type = Some(ProdType::Simple);

        // 无图产品 → 完整性错误
        let error = ImageProcessor::render(&mut arena, item);
        assert!(error.is_some());

        ImageProcessor::register(&mut arena, &mut index, item, "a.jpg");
        ImageProcessor::register(&mut arena, &mut index, item, "b.jpg");
        let error = ImageProcessor::render(&mut arena, item);
        assert!(error.is_none());
        assert_eq!(arena.get(item).get("imgsum"), Some("a.jpg|b.jpg"));
    }
}
