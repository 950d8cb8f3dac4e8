// ==========================================
// 商品目录生成系统 - 端到端解析集成测试
// ==========================================
// 覆盖: 完整目录行 → 对象图（分类/产品/变体/属性/图片/
//       动态规则/促销价）与错误日志可检视性
// ==========================================

use catalog_gen::{
    CsvRowSource, DynamicRuleEngine, ParseConfig, ParseSession, SpecialsEngine, VecRowSource,
};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::io::Write;

// ==========================================
// 辅助函数
// ==========================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
}

fn simple_config() -> ParseConfig {
    let mut config = ParseConfig::new(vec!["Cat1".to_string()], vec!["Item1".to_string()]);
    config.source = Some("generator".to_string());
    config
}

fn rows(grid: &[&[&str]]) -> Vec<Vec<String>> {
    grid.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

fn spring_rules() -> BTreeMap<String, catalog_gen::SpecialRule> {
    let source = VecRowSource::new(
        "specials",
        rows(&[
            &["ID", "FROM", "TO", "RNS", "RPS", "WNS", "WPS", "DNS", "DPS"],
            &["SPRING", "01/01/2026", "01/06/2026", "10%", "", "", "", "", ""],
        ]),
    );
    let (rules, errors) = SpecialsEngine::parse_table(&source).unwrap();
    assert!(errors.is_empty());
    rules
}

// ==========================================
// 基准场景: 分类 + 带促销的产品
// ==========================================

#[test]
fn test_end_to_end_category_product_special() {
    let mut session = ParseSession::new(simple_config())
        .unwrap()
        .with_special_rules(spring_rules());

    let summary = session
        .analyse_rows(
            rows(&[
                &["Cat1", "Item1", "CODE", "itemtype", "RNR", "SCHEDULE", "Images"],
                &["Category A", "", "A", "", "", "", ""],
                &["", "Product A1", "A1", "S", "50", "SPRING", "a1.jpg"],
            ]),
            now(),
        )
        .unwrap();

    assert_eq!(summary.records_created, 2);
    assert_eq!(summary.categories, 1);
    assert_eq!(summary.products, 1);

    let product = session.find_by_codesum("A-A1").expect("产品未找到");
    // 根→自身累计字段
    let parent = session.node(product.parent.unwrap());
    assert_eq!(parent.codesum, "A");
    assert_eq!(product.codesum, "A-A1");
    // 零售普通档: 50 × (100-10)/100 = 45.00
    assert_eq!(product.get("RNS"), Some("45.00"));
    assert_eq!(product.get("sale_price"), Some("45.00"));
}

// ==========================================
// 属性聚合
// ==========================================

#[test]
fn test_variable_product_attribute_aggregation() {
    let mut config = ParseConfig::new(
        vec!["Cat1".to_string()],
        vec!["Item1".to_string(), "Item2".to_string()],
    );
    config.source = Some("generator".to_string());
    let mut session = ParseSession::new(config).unwrap();

    session
        .analyse_rows(
            rows(&[
                &["Cat1", "Item1", "Item2", "CODE", "itemtype", "PA", "VA", "Images"],
                &["Apparel", "", "", "AP", "", r#"{"Brand": "TechnoTan"}"#, "", ""],
                &["", "Dress", "", "DR", "V", "", "", "dress.jpg"],
                &["", "", "Size 8", "S8", "I", "", r#"{"Size": "8"}"#, ""],
                &["", "", "Size 10", "S10", "I", "", r#"{"Size": "10"}"#, ""],
            ]),
            now(),
        )
        .unwrap();

    let dress = session.find_by_codesum("AP-DR").expect("可变产品未找到");

    // 分类 PA 注入产品
    assert_eq!(dress.get("attribute:Brand"), Some("TechnoTan"));
    // 变体 VA 聚合到父产品: 值表、默认值（首个变体值）、variation 标志
    assert_eq!(dress.get("attribute:Size"), Some("8|10"));
    assert_eq!(dress.get("attribute_default:Size"), Some("8"));
    let size_data = dress.get("attribute_data:Size").unwrap();
    // position|visible|variation
    assert!(size_data.ends_with("|1|1"));

    // 变体自身: meta 字段 + variation 标志
    let size8 = session.find_by_codesum("AP-DR-S8").unwrap();
    assert_eq!(size8.get("meta:attribute_Size"), Some("8"));
    assert!(size8.attribute("Size").unwrap().variation);

    // 会话级属性值索引
    assert_eq!(
        session.attributes.get(&"Size".to_string()),
        Some(&["8".to_string(), "10".to_string()][..])
    );
}

#[test]
fn test_malformed_attribute_json_registers_row_error() {
    let mut session = ParseSession::new(simple_config()).unwrap();

    session
        .analyse_rows(
            rows(&[
                &["Cat1", "Item1", "CODE", "itemtype", "PA", "Images"],
                &["Cat", "", "C", "", "", ""],
                &["", "Prod", "P", "S", "not-json", "p.jpg"],
            ]),
            now(),
        )
        .unwrap();

    let errors = session.errors.get(&3).expect("JSON 错误应按行登记");
    assert!(errors.iter().any(|e| e.contains("JSON")));
    // 行本身未被丢弃
    assert!(session.find_by_codesum("C-P").is_some());
}

// ==========================================
// 动态规则
// ==========================================

#[test]
fn test_dynamic_rules_injected_from_category_chain() {
    let source = VecRowSource::new(
        "dyn",
        rows(&[
            &["ID", "HTML"],
            &["BULK", "<p>满十件九折</p>"],
            &["VIP", "<p>会员价</p>"],
        ]),
    );
    let (dyn_rules, _) = DynamicRuleEngine::parse_table(&source).unwrap();

    let mut session = ParseSession::new(simple_config())
        .unwrap()
        .with_category_rules(dyn_rules.clone())
        .with_product_rules(dyn_rules);

    session
        .analyse_rows(
            rows(&[
                &["Cat1", "Item1", "CODE", "itemtype", "DYNCAT", "DYNPROD", "Images"],
                &["Cat", "", "C", "", "BULK", "", ""],
                &["", "Prod", "P", "S", "", "VIP|MISSING", "p.jpg"],
            ]),
            now(),
        )
        .unwrap();

    let product = session.find_by_codesum("C-P").unwrap();
    // 分类规则沿链注入
    assert_eq!(product.cat_rule_ids, vec!["BULK"]);
    assert_eq!(product.get("dprcsum"), Some("<p>满十件九折</p>"));
    // 产品规则来自自身列表;缺失 ID 记引用错误但不阻断
    assert_eq!(product.prod_rule_ids, vec!["VIP", "MISSING"]);
    assert_eq!(product.get("dprpsum"), Some("<p>会员价</p>"));
    let errors = session.errors.get(&3).unwrap();
    assert!(errors.iter().any(|e| e.contains("MISSING")));
}

// ==========================================
// 图片
// ==========================================

#[test]
fn test_images_indexed_and_shared_upward() {
    let mut session = ParseSession::new(simple_config()).unwrap();

    session
        .analyse_rows(
            rows(&[
                &["Cat1", "Item1", "CODE", "itemtype", "Images"],
                &["Cat", "", "C", "", ""],
                &["", "Prod", "P", "S", "front.jpg back.png"],
            ]),
            now(),
        )
        .unwrap();

    let product = session.find_by_codesum("C-P").unwrap();
    assert_eq!(product.get("imgsum"), Some("front.jpg|back.png"));

    // 无图分类共享了产品首图
    let category = session.find_by_codesum("C").unwrap();
    assert_eq!(category.images, vec!["front.jpg"]);

    // 会话级图片索引: 文件名 → 节点
    assert_eq!(
        session.images.get(&"front.jpg".to_string()),
        Some(&[product.id][..])
    );
}

#[test]
fn test_product_without_image_is_integrity_error() {
    let mut session = ParseSession::new(simple_config()).unwrap();

    session
        .analyse_rows(
            rows(&[
                &["Cat1", "Item1", "CODE", "itemtype", "Images"],
                &["Cat", "", "C", "", ""],
                &["", "Prod", "P", "S", ""],
            ]),
            now(),
        )
        .unwrap();

    let errors = session.errors.get(&3).expect("无图产品应记完整性错误");
    assert!(errors.iter().any(|e| e.contains("图片")));
    // 报告而不中止: 产品仍在图中
    assert!(session.find_by_codesum("C-P").is_some());
}

// ==========================================
// 错误日志门控
// ==========================================

#[test]
fn test_completed_parse_with_errors_is_usable_but_inspectable() {
    let specials_file = {
        let mut temp_file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(temp_file, "ID,FROM,TO,RNS,RPS,WNS,WPS,DNS,DPS").unwrap();
        writeln!(temp_file, "SPRING,01/01/2026,01/06/2026,10%,,,,,").unwrap();
        temp_file.flush().unwrap();
        temp_file
    };
    let (rules, _) =
        SpecialsEngine::parse_table(&CsvRowSource::new(specials_file.path())).unwrap();

    let mut session = ParseSession::new(simple_config())
        .unwrap()
        .with_special_rules(rules);

    session
        .analyse_rows(
            rows(&[
                &["Cat1", "Item1", "CODE", "itemtype", "RNR", "SCHEDULE", "Images"],
                &["Cat", "", "C", "", "", "", ""],
                &["", "Good", "G", "S", "50", "SPRING", "g.jpg"],
                &["", "Bad", "B", "S", "50", "UNKNOWN", "b.jpg"],
            ]),
            now(),
        )
        .unwrap();

    // 完成但带错误: 正常节点数据可用
    assert_eq!(
        session.find_by_codesum("C-G").unwrap().get("RNS"),
        Some("45.00")
    );
    // 调用方据此拒绝进入下游定价同步
    assert!(session.has_errors());
    let errors = session.errors.get(&4).unwrap();
    assert!(errors.iter().any(|e| e.contains("UNKNOWN")));
}
