// ==========================================
// 商品目录生成系统 - 领域类型定义
// ==========================================
// 产品形态代码与价格档位体系
// 序列化格式: 与目录导出格式一致的 wire name
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 产品形态 (Product Type)
// ==========================================
// 源数据 itemtype 列使用单字母代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProdType {
    Simple,    // S - 简单产品
    Variable,  // V - 可变产品(拥有变体)
    Variation, // I - 变体实例
    Composite, // C - 组合产品
    Grouped,   // G - 分组产品
    Bundle,    // B - 捆绑产品
}

impl ProdType {
    /// 从 itemtype 单字母代码识别产品形态
    ///
    /// # 返回
    /// - Some(ProdType): 识别成功
    /// - None: 非产品行（普通条目）
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(ProdType::Simple),
            "V" => Some(ProdType::Variable),
            "I" => Some(ProdType::Variation),
            "C" => Some(ProdType::Composite),
            "G" => Some(ProdType::Grouped),
            "B" => Some(ProdType::Bundle),
            _ => None,
        }
    }

    /// 导出格式中的形态名称
    pub fn wire_name(&self) -> &'static str {
        match self {
            ProdType::Simple => "simple",
            ProdType::Variable => "variable",
            ProdType::Variation => "variable-instance",
            ProdType::Composite => "composite",
            ProdType::Grouped => "grouped",
            ProdType::Bundle => "bundle",
        }
    }

    /// 是否为一级产品（变体实例不是,它从属于可变产品）
    pub fn is_first_order(&self) -> bool {
        !matches!(self, ProdType::Variation)
    }
}

impl fmt::Display for ProdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

// ==========================================
// 价格档位 (Price Tier)
// ==========================================
// 零售/批发/分销 × 普通/整装 = 六档
// 字段键派生: <档位>R=原价 <档位>S=促销价 <档位>F/<档位>T=促销窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceTier {
    RetailNormal,        // RN - 零售普通
    RetailPackaged,      // RP - 零售整装
    WholesaleNormal,     // WN - 批发普通
    WholesalePackaged,   // WP - 批发整装
    DistributorNormal,   // DN - 分销普通
    DistributorPackaged, // DP - 分销整装
}

impl PriceTier {
    /// 全部六档,按处理顺序排列
    pub const ALL: [PriceTier; 6] = [
        PriceTier::RetailNormal,
        PriceTier::RetailPackaged,
        PriceTier::WholesaleNormal,
        PriceTier::WholesalePackaged,
        PriceTier::DistributorNormal,
        PriceTier::DistributorPackaged,
    ];

    /// 档位代码（两字母）
    pub fn code(&self) -> &'static str {
        match self {
            PriceTier::RetailNormal => "RN",
            PriceTier::RetailPackaged => "RP",
            PriceTier::WholesaleNormal => "WN",
            PriceTier::WholesalePackaged => "WP",
            PriceTier::DistributorNormal => "DN",
            PriceTier::DistributorPackaged => "DP",
        }
    }

    /// 原价字段键（如 RNR）
    pub fn regular_key(&self) -> &'static str {
        match self {
            PriceTier::RetailNormal => "RNR",
            PriceTier::RetailPackaged => "RPR",
            PriceTier::WholesaleNormal => "WNR",
            PriceTier::WholesalePackaged => "WPR",
            PriceTier::DistributorNormal => "DNR",
            PriceTier::DistributorPackaged => "DPR",
        }
    }

    /// 促销价字段键（如 RNS）
    pub fn sale_key(&self) -> &'static str {
        match self {
            PriceTier::RetailNormal => "RNS",
            PriceTier::RetailPackaged => "RPS",
            PriceTier::WholesaleNormal => "WNS",
            PriceTier::WholesalePackaged => "WPS",
            PriceTier::DistributorNormal => "DNS",
            PriceTier::DistributorPackaged => "DPS",
        }
    }

    /// 促销开始时间字段键（如 RNF）
    pub fn from_key(&self) -> &'static str {
        match self {
            PriceTier::RetailNormal => "RNF",
            PriceTier::RetailPackaged => "RPF",
            PriceTier::WholesaleNormal => "WNF",
            PriceTier::WholesalePackaged => "WPF",
            PriceTier::DistributorNormal => "DNF",
            PriceTier::DistributorPackaged => "DPF",
        }
    }

    /// 促销结束时间字段键（如 RNT）
    pub fn to_key(&self) -> &'static str {
        match self {
            PriceTier::RetailNormal => "RNT",
            PriceTier::RetailPackaged => "RPT",
            PriceTier::WholesaleNormal => "WNT",
            PriceTier::WholesalePackaged => "WPT",
            PriceTier::DistributorNormal => "DNT",
            PriceTier::DistributorPackaged => "DPT",
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ==========================================
// 动态规则种类 (Dynamic Rule Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DynKind {
    Category, // 分类定价规则（DYNCAT 列引用）
    Product,  // 产品定价规则（DYNPROD 列引用）
}

impl DynKind {
    /// 引用该类规则 ID 列表的列名
    pub fn column(&self) -> &'static str {
        match self {
            DynKind::Category => "DYNCAT",
            DynKind::Product => "DYNPROD",
        }
    }

    /// 规则摘要字段键
    pub fn summary_key(&self) -> &'static str {
        match self {
            DynKind::Category => "dprcsum",
            DynKind::Product => "dprpsum",
        }
    }
}

impl fmt::Display for DynKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynKind::Category => write!(f, "DYNCAT"),
            DynKind::Product => write!(f, "DYNPROD"),
        }
    }
}
