//! 插件缓存管理
//! 仅处理插件定义的本地序列化（MessagePack）和反序列化

use std::path::Path;
use rmp_serde::from_slice;
use tracing::debug;

use super::model::PluginSpec;
use crate::error::{RsdResult, RsdetectemError};

/// 插件缓存管理器
pub struct CatalogCache;

impl CatalogCache {
    /// 从本地缓存加载插件定义
    pub async fn load(cache_path: &Path) -> RsdResult<Vec<PluginSpec>> {
        let cache_data = tokio::fs::read(cache_path).await?;

        // MessagePack反序列化
        let specs: Vec<PluginSpec> = from_slice(&cache_data)
            .map_err(|e| RsdetectemError::MsgPackError(format!("反序列化失败：{}", e)))?;

        debug!("缓存文件反序列化成功，插件数：{}", specs.len());

        Ok(specs)
    }

    /// 将插件定义缓存到本地
    pub async fn save(cache_path: &Path, specs: &[PluginSpec]) -> RsdResult<()> {
        // 使用带字段名的map编码，可选字段省略后仍可正确反序列化
        let cache_data = rmp_serde::to_vec_named(specs)
            .map_err(|e| RsdetectemError::MsgPackError(format!("序列化失败：{}", e)))?;

        debug!("插件序列化成功，序列化后数据大小：{} 字节", cache_data.len());

        tokio::fs::write(cache_path, cache_data)
            .await
            .map_err(|e| RsdetectemError::CatalogCacheError(format!("{}：{}", cache_path.display(), e)))
    }

    /// 清除本地缓存
    pub async fn clear(cache_path: &Path) -> RsdResult<()> {
        if tokio::fs::try_exists(cache_path).await? {
            tokio::fs::remove_file(cache_path).await?;
        }
        Ok(())
    }
}
