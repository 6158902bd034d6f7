//! 全局检测器单例管理
//! 插件目录在进程内只加载一次，之后只读共享，不提供销毁
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::detector::Detector;
use super::result::DetectionResult;
use crate::compiler::PluginCatalog;
use crate::error::{RsdResult, RsdetectemError};
use crate::config::{ConfigManager, GlobalConfig};
use crate::extractor::Transaction;

/// 全局检测器实例
static GLOBAL_DETECTOR: Lazy<Arc<OnceCell<Detector>>> = Lazy::new(|| {
    Arc::new(OnceCell::new())
});

/// 初始化全局检测器（默认配置）
pub async fn init_rsdetectem() -> RsdResult<()> {
    init_rsdetectem_with_config(ConfigManager::get_default()).await
}

/// 带自定义配置初始化全局检测器，重复调用不会重新加载
pub async fn init_rsdetectem_with_config(config: GlobalConfig) -> RsdResult<()> {
    GLOBAL_DETECTOR
        .get_or_try_init(|| Detector::from_config(config))
        .await?;
    Ok(())
}

/// 使用已编译的插件目录初始化全局检测器；已初始化时返回 false
pub fn init_rsdetectem_with_catalog(catalog: PluginCatalog, config: GlobalConfig) -> RsdResult<bool> {
    if GLOBAL_DETECTOR.initialized() {
        return Ok(false);
    }
    let detector = Detector::new(catalog, config)?;
    Ok(GLOBAL_DETECTOR.set(detector).is_ok())
}

/// 获取全局检测器
pub fn get_global_detector() -> RsdResult<&'static Detector> {
    GLOBAL_DETECTOR.get()
        .ok_or(RsdetectemError::DetectorNotInitialized)
}

/// 使用全局检测器检测事务
pub fn detect_transaction(transaction: &Transaction) -> RsdResult<DetectionResult> {
    let detector = get_global_detector()?;
    Ok(detector.detect(transaction))
}
