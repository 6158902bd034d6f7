//! HAR条目转换
//! 将抓包得到的HAR条目（request.url / response.headers / response.content.text）转换为事务

use serde::Deserialize;

use super::transaction::Transaction;
use crate::error::RsdResult;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarEntry {
    #[serde(default)]
    pub request: HarRequest,
    #[serde(default)]
    pub response: HarResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarResponse {
    #[serde(default)]
    pub headers: Option<Vec<HarHeader>>,
    #[serde(default)]
    pub content: HarContent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarContent {
    #[serde(default)]
    pub text: Option<String>,
}

impl From<HarEntry> for Transaction {
    fn from(entry: HarEntry) -> Self {
        let mut tx = Transaction::new();
        if let Some(url) = entry.request.url {
            tx = tx.with_url(url);
        }
        if let Some(text) = entry.response.content.text {
            tx = tx.with_body(text);
        }
        if let Some(headers) = entry.response.headers {
            tx = tx.with_headers(headers.into_iter().map(|h| (h.name, h.value)).collect());
        }
        tx
    }
}

impl Transaction {
    /// 从HAR条目JSON构造事务
    pub fn from_har_entry(json: &str) -> RsdResult<Self> {
        let entry: HarEntry = serde_json::from_str(json)?;
        Ok(entry.into())
    }

    /// 从已解析的HAR条目JSON值构造事务
    pub fn from_har_value(value: serde_json::Value) -> RsdResult<Self> {
        let entry: HarEntry = serde_json::from_value(value)?;
        Ok(entry.into())
    }
}
