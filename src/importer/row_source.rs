// ==========================================
// 商品目录生成系统 - 行来源抽象
// ==========================================
// 核心只依赖 "表头 + 行序列",文件/流/API 分页皆可
// 支持: Excel (.xlsx/.xls) / CSV (.csv) / 内存行
// ==========================================
// 注: 空白行原样返回,行号由解析会话统计（序号不能漂移）
// ==========================================

use crate::importer::error::{ParseError, ParseResult};
use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};

// ==========================================
// RowSource Trait
// ==========================================
// 用途: 为解析会话提供完整行网格（行 0 = 表头）
pub trait RowSource {
    /// 读取全部行（含表头行与空白行,保持物理行序）
    fn read_rows(&self) -> ParseResult<Vec<Vec<String>>>;

    /// 来源名称（用于日志与错误信息）
    fn name(&self) -> String;
}

// ==========================================
// CsvRowSource - CSV 文件来源
// ==========================================
pub struct CsvRowSource {
    path: PathBuf,
}

impl CsvRowSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RowSource for CsvRowSource {
    fn read_rows(&self) -> ParseResult<Vec<Vec<String>>> {
        let path = &self.path;

        // 检查文件存在
        if !path.exists() {
            return Err(ParseError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        if let Some(ext) = path.extension() {
            if ext != "csv" {
                return Err(ParseError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        // 打开 CSV 文件
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头由解析会话消费
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(rows)
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

// ==========================================
// ExcelRowSource - Excel 文件来源
// ==========================================
pub struct ExcelRowSource {
    path: PathBuf,
}

impl ExcelRowSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RowSource for ExcelRowSource {
    fn read_rows(&self) -> ParseResult<Vec<Vec<String>>> {
        let path = &self.path;

        // 检查文件存在
        if !path.exists() {
            return Err(ParseError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != "xlsx" && ext != "xls" {
            return Err(ParseError::UnsupportedFormat(ext.to_string()));
        }

        // 打开 Excel 文件
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e: calamine::XlsxError| ParseError::ExcelParseError(e.to_string()))?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ParseError::ExcelParseError(
                "Excel 文件无工作表".to_string(),
            ));
        }

        let sheet_name = sheet_names[0].clone();
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ParseError::ExcelParseError(e.to_string()))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        Ok(rows)
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

// ==========================================
// VecRowSource - 内存行来源
// ==========================================
// 用途: 测试 / API 分页转交
pub struct VecRowSource {
    name: String,
    rows: Vec<Vec<String>>,
}

impl VecRowSource {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

impl RowSource for VecRowSource {
    fn read_rows(&self) -> ParseResult<Vec<Vec<String>>> {
        Ok(self.rows.clone())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

// ==========================================
// UniversalRowSource - 按扩展名自动选择
// ==========================================
pub struct UniversalRowSource;

impl UniversalRowSource {
    pub fn open<P: AsRef<Path>>(file_path: P) -> ParseResult<Box<dyn RowSource>> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(Box::new(CsvRowSource::new(path))),
            "xlsx" | "xls" => Ok(Box::new(ExcelRowSource::new(path))),
            _ => Err(ParseError::UnsupportedFormat(ext)),
        }
    }
}
