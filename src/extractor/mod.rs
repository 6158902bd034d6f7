//! 提取模块：事务模型、字段提取、内联脚本与HAR条目转换
pub mod transaction;
pub mod field;
pub mod html_extractor;
pub mod har;

pub use self::transaction::{Field, Transaction};
pub use self::field::{FieldExtractor, FieldValue};
pub use self::html_extractor::HtmlExtractor;
pub use self::har::HarEntry;
