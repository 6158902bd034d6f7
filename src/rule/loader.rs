//! 插件加载管理器
//! 负责从本地缓存或插件定义文件（JSON/YAML，单文件或目录）加载插件

use std::path::{Path, PathBuf};
use serde::Deserialize;
use tracing::{debug, warn};

use super::model::PluginSpec;
use super::cache::CatalogCache;
use crate::error::{RsdResult, RsdetectemError};
use crate::config::GlobalConfig;

/// 插件文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginFileType {
    Json,
    Yaml,
}

impl PluginFileType {
    /// 根据扩展名识别文件类型
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// 单个文件可包含一个插件或插件列表
#[derive(Deserialize)]
#[serde(untagged)]
enum PluginDocument {
    Many(Vec<PluginSpec>),
    One(Box<PluginSpec>),
}

impl PluginDocument {
    fn into_vec(self) -> Vec<PluginSpec> {
        match self {
            PluginDocument::Many(list) => list,
            PluginDocument::One(spec) => vec![*spec],
        }
    }
}

/// 插件加载管理器
pub struct PluginLoader;

impl PluginLoader {
    /// 加载插件（优先本地缓存，缓存不存在则读取插件定义文件）
    pub async fn load(config: &GlobalConfig) -> RsdResult<Vec<PluginSpec>> {
        // 1. 优先加载本地缓存
        if let Some(cache_path) = &config.catalog_cache_path {
            match CatalogCache::load(cache_path).await {
                Ok(specs) => {
                    debug!("从本地缓存加载插件成功，插件数：{}", specs.len());
                    return Ok(specs);
                }
                Err(e) => warn!("本地缓存不存在或损坏，将读取插件定义：{}", e),
            }
        }

        // 2. 读取插件定义文件
        let mut specs = Vec::new();
        for path in &config.plugin_paths {
            specs.extend(Self::load_path(path).await?);
        }
        debug!("插件定义读取完成，插件数：{}", specs.len());

        // 3. 缓存到本地
        if let Some(cache_path) = &config.catalog_cache_path {
            if let Err(e) = CatalogCache::save(cache_path, &specs).await {
                warn!("插件缓存到本地失败：{}", e);
            } else {
                debug!("插件已缓存到本地");
            }
        }

        Ok(specs)
    }

    /// 加载单个文件，或目录下全部插件文件（按文件名排序，不递归）
    pub async fn load_path(path: &Path) -> RsdResult<Vec<PluginSpec>> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            RsdetectemError::PluginLoadError(format!("{}：{}", path.display(), e))
        })?;

        if !metadata.is_dir() {
            return Self::load_file(path).await;
        }

        let mut files: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            if entry.file_type().await?.is_file() && PluginFileType::from_path(&entry_path).is_some() {
                files.push(entry_path);
            }
        }
        files.sort();

        let mut specs = Vec::new();
        for file in &files {
            specs.extend(Self::load_file(file).await?);
        }
        Ok(specs)
    }

    /// 加载单个插件文件
    pub async fn load_file(path: &Path) -> RsdResult<Vec<PluginSpec>> {
        let file_type = PluginFileType::from_path(path).ok_or_else(|| {
            RsdetectemError::PluginLoadError(format!("不支持的插件文件类型：{}", path.display()))
        })?;
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content, file_type).map_err(|e| {
            RsdetectemError::PluginParseError(format!("{}：{}", path.display(), e))
        })
    }

    /// 按类型解析插件文本
    pub fn parse(content: &str, file_type: PluginFileType) -> RsdResult<Vec<PluginSpec>> {
        match file_type {
            PluginFileType::Json => Self::from_json_str(content),
            PluginFileType::Yaml => Self::from_yaml_str(content),
        }
    }

    pub fn from_json_str(content: &str) -> RsdResult<Vec<PluginSpec>> {
        let document: PluginDocument = serde_json::from_str(content)?;
        Ok(document.into_vec())
    }

    pub fn from_yaml_str(content: &str) -> RsdResult<Vec<PluginSpec>> {
        let document: PluginDocument = serde_yaml::from_str(content)?;
        Ok(document.into_vec())
    }
}
