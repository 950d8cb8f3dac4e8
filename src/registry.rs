// ==========================================
// 商品目录生成系统 - 通用键值登记
// ==========================================
// 职责: 所有索引（行号/SKU/标题/图片名/规则 ID）统一经由本模块登记
// 红线: 重复键策略只在这一处实现,上层不得自行判重
// ==========================================

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ==========================================
// ConflictPolicy - 重复键策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// 保留先登记的条目,静默丢弃新条目
    Ignore,
    /// 返回 DuplicateKeyError,由调用方决定如何处置
    Raise,
}

// ==========================================
// DuplicateKeyError - 重复键错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("登记表 {register} 中键重复: {key}")]
pub struct DuplicateKeyError {
    pub register: &'static str,
    pub key: String,
}

// ==========================================
// Registry - 单值登记表
// ==========================================
// 用途: 每键一条记录（对象/分类/产品/变体索引）
// 存储: BTreeMap,遍历顺序确定（按键序）
#[derive(Debug, Clone)]
pub struct Registry<K, V> {
    name: &'static str,
    policy: ConflictPolicy,
    entries: BTreeMap<K, V>,
}

impl<K, V> Registry<K, V>
where
    K: Ord + Clone + fmt::Display,
{
    /// 创建登记表
    ///
    /// # 参数
    /// - name: 登记表名称（出现在错误信息中）
    /// - policy: 重复键策略
    pub fn new(name: &'static str, policy: ConflictPolicy) -> Self {
        Self {
            name,
            policy,
            entries: BTreeMap::new(),
        }
    }

    /// 登记一条记录
    ///
    /// # 规则
    /// - 键未占用 → 写入
    /// - 键已占用 + Ignore → 保留旧值,静默返回 Ok
    /// - 键已占用 + Raise → 返回 DuplicateKeyError,旧值不变
    pub fn register(&mut self, key: K, value: V) -> Result<(), DuplicateKeyError> {
        if self.entries.contains_key(&key) {
            return match self.policy {
                ConflictPolicy::Ignore => Ok(()),
                ConflictPolicy::Raise => Err(DuplicateKeyError {
                    register: self.name,
                    key: key.to_string(),
                }),
            };
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// 交出内部映射（登记完成后移交下游只读使用）
    pub fn into_inner(self) -> BTreeMap<K, V> {
        self.entries
    }
}

// ==========================================
// MultiRegistry - 列表桶登记表
// ==========================================
// 用途: 每键多条记录（错误日志/消息日志/图片索引/属性值表）
#[derive(Debug, Clone)]
pub struct MultiRegistry<K, V> {
    name: &'static str,
    entries: BTreeMap<K, Vec<V>>,
}

impl<K, V> MultiRegistry<K, V>
where
    K: Ord + Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: BTreeMap::new(),
        }
    }

    /// 追加一条记录到键对应的桶,桶不存在时自动创建
    pub fn append(&mut self, key: K, value: V) {
        self.entries.entry(key).or_default().push(value);
    }

    /// 追加记录,桶内已存在相同值时跳过
    pub fn append_unique(&mut self, key: K, value: V)
    where
        V: PartialEq,
    {
        let bucket = self.entries.entry(key).or_default();
        if !bucket.contains(&value) {
            bucket.push(value);
        }
    }

    pub fn get(&self, key: &K) -> Option<&[V]> {
        self.entries.get(key).map(|bucket| bucket.as_slice())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 键的数量（桶数,不是记录总数）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 记录总数（所有桶求和）
    pub fn total(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Vec<V>)> {
        self.entries.iter()
    }

    /// 第一个桶的第一条记录（按键序）,用于 strict 模式升级首个错误
    pub fn first(&self) -> Option<(&K, &V)> {
        self.entries
            .iter()
            .next()
            .and_then(|(key, bucket)| bucket.first().map(|value| (key, value)))
    }
}
