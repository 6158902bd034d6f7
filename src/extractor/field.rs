//! 字段提取器
//! 从事务中取出单个字段的原始值；字段未填充属于调用方错误，而非"未匹配"

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;
use url::Url;

use super::html_extractor::HtmlExtractor;
use super::transaction::{Field, Transaction};
use crate::error::{RsdResult, RsdetectemError};

/// 字段原始值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// url / body 文本
    Text(&'a str),
    /// 完整的有序响应头列表
    Headers(&'a [(String, String)]),
}

/// 字段提取器
pub struct FieldExtractor;

impl FieldExtractor {
    /// 提取指定字段的原始值
    pub fn extract(transaction: &Transaction, field: Field) -> RsdResult<FieldValue<'_>> {
        let value = match field {
            Field::Url => transaction.url().map(FieldValue::Text),
            Field::Body => transaction.body().map(FieldValue::Text),
            Field::Header => transaction.headers().map(FieldValue::Headers),
        };
        value.ok_or(RsdetectemError::MissingField(field))
    }

    /// 提取供脚本探测依次执行的脚本块（文档顺序）
    ///
    /// 响应本身是脚本（URL以 .js/.mjs 结尾或 Content-Type 含 javascript）时整段作为一个块，
    /// 否则每个内联 `<script>` 为一个块，与浏览器一样各自独立执行。
    pub fn script_sources(transaction: &Transaction, max_bytes: usize) -> Vec<String> {
        let Some(body) = transaction.body() else {
            return Vec::new();
        };
        if body.trim().is_empty() || body.len() > max_bytes {
            trace!("跳过脚本提取，body长度={}", body.len());
            return Vec::new();
        }

        if Self::is_script_response(transaction) {
            return vec![body.to_string()];
        }
        HtmlExtractor::new().extract(body).get_inline_scripts()
    }

    /// 判断响应是否为JavaScript资源
    fn is_script_response(transaction: &Transaction) -> bool {
        static SCRIPT_PATH_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)\.m?js$").unwrap()
        });

        if let Some(content_type) = transaction.header("content-type") {
            if content_type.to_ascii_lowercase().contains("javascript") {
                return true;
            }
        }

        let Some(raw_url) = transaction.url() else {
            return false;
        };
        match Url::parse(raw_url) {
            Ok(parsed) => SCRIPT_PATH_REGEX.is_match(parsed.path()),
            // 相对路径等无法解析的URL，去掉查询串后直接判断
            Err(_) => {
                let path = raw_url.split(['?', '#']).next().unwrap_or(raw_url);
                SCRIPT_PATH_REGEX.is_match(path)
            }
        }
    }
}
