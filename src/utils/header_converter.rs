//! Header格式转换工具
//! 将 HeaderMap 转换为事务使用的有序 (名称, 值) 列表

use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use crate::extractor::Transaction;

/// 单个响应最多保留的Header数
const MAX_HEADERS: usize = 1000;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap转换为有序列表（同名多值依次展开，非UTF-8值按有损方式转换）
    pub fn to_pairs(header_map: &HeaderMap) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(header_map.len());

        for (key, value) in header_map.iter() {
            if pairs.len() >= MAX_HEADERS {
                warn!("Header数量超过{}，剩余部分已忽略", MAX_HEADERS);
                break;
            }
            let value_str = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            pairs.push((key.as_str().to_string(), value_str));
        }

        debug!("Header转换完成，生成{}条记录", pairs.len());
        pairs
    }
}

impl Transaction {
    /// 使用 HeaderMap 设置响应头
    pub fn with_header_map(self, header_map: &HeaderMap) -> Self {
        self.with_headers(HeaderConverter::to_pairs(header_map))
    }
}
