// ==========================================
// 商品目录生成系统 - 属性聚合引擎
// ==========================================
// 职责: 产品族（简单/可变/变体）属性键值对合并
// 输出: 目录导出格式的 attribute:* / attribute_data:* /
//       attribute_default:* / meta:attribute_* 字段
// ==========================================

use crate::domain::node::Node;
use serde_json::Value;
use tracing::debug;

// ==========================================
// AttributeAggregator - 属性聚合引擎
// ==========================================
pub struct AttributeAggregator;

impl AttributeAggregator {
    /// 解码 PA/VA 列的 JSON 属性表
    ///
    /// # 返回
    /// - Ok(Vec<(键, 值)>): 标量值统一转为文本,null 跳过
    /// - Err(String): 非 JSON 或非对象
    pub fn decode_attribute_map(json: &str) -> Result<Vec<(String, String)>, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("属性 JSON 解析失败: {}", e))?;
        let object = match value {
            Value::Object(object) => object,
            other => return Err(format!("属性必须是 JSON 对象,实际: {}", other)),
        };

        let mut pairs = Vec::new();
        for (key, value) in object {
            let rendered = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null => continue,
                other => other.to_string(),
            };
            pairs.push((key, rendered));
        }
        Ok(pairs)
    }

    /// 登记一个属性键值对
    ///
    /// # 规则
    /// 1. 键首次出现 → 新条目 values=[value], visible=true, variation=false
    /// 2. 已有键 + 新值 → 追加 values;重复值为空操作
    /// 3. as_variation: 首次见值时写 default,并置 variation=true
    ///    （对变体自身与可变产品的副本都按此规则调用）
    pub fn register(node: &mut Node, key: &str, value: &str, as_variation: bool) {
        if let Some(entry) = node.attribute_mut(key) {
            if !entry.values.iter().any(|existing| existing == value) {
                entry.values.push(value.to_string());
            }
            if as_variation {
                if entry.default.is_none() {
                    entry.default = Some(value.to_string());
                }
                entry.variation = true;
            }
            return;
        }

        let position = node.attributes.len();
        let mut entry =
            crate::domain::node::AttributeEntry::new(key.to_string(), value.to_string(), position);
        if as_variation {
            entry.default = Some(value.to_string());
            entry.variation = true;
        }
        debug!(codesum = %node.codesum, key, position, "新属性条目");
        node.attributes.push(entry);
    }

    /// 渲染属性导出字段
    ///
    /// # 规则
    /// - 产品: attribute:<键> = values 管道连接;
    ///   attribute_data:<键> = position|visible|variation（0/1 编码）;
    ///   attribute_default:<键> = 默认值（无则空串）
    /// - 变体: meta:attribute_<键> = values 管道连接;
    ///   variation 未置位 → 完整性错误（报告,不修正）
    ///
    /// # 返回
    /// 完整性错误信息列表
    pub fn render(node: &mut Node) -> Vec<String> {
        let mut errors = Vec::new();
        let mut writes: Vec<(String, String)> = Vec::new();

        let is_product = node.is_product() && !node.is_variation();
        let is_variation = node.is_variation();

        for entry in &node.attributes {
            let values = entry.values.join("|");

            if is_product {
                writes.push((format!("attribute:{}", entry.key), values.clone()));
                writes.push((
                    format!("attribute_data:{}", entry.key),
                    format!(
                        "{}|{}|{}",
                        entry.position,
                        u8::from(entry.visible),
                        u8::from(entry.variation)
                    ),
                ));
                writes.push((
                    format!("attribute_default:{}", entry.key),
                    entry.default.clone().unwrap_or_default(),
                ));
            }

            if is_variation {
                if !entry.variation {
                    errors.push(format!(
                        "变体属性 {} 未置 variation 标志",
                        entry.key
                    ));
                }
                writes.push((format!("meta:attribute_{}", entry.key), values));
            }
        }

        for (key, value) in writes {
            node.set(&key, value);
        }
        errors
    }
}
