//! 集成测试公共工具
#![allow(dead_code)]

use std::path::PathBuf;

use rsdetectem::{PluginCatalog, PluginCompiler, PluginLoader};

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

pub fn plugin_dir() -> PathBuf {
    data_dir().join("plugins")
}

/// 加载并编译测试插件目录
pub async fn test_catalog() -> anyhow::Result<PluginCatalog> {
    let specs = PluginLoader::load_path(&plugin_dir()).await?;
    Ok(PluginCompiler::compile(&specs)?)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rsdetectem=debug")
        .with_test_writer()
        .try_init();
}
