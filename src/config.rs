//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

/// 脚本沙箱资源限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    // 单次探测（执行页面脚本 + 全部表达式）的最长耗时
    pub time_limit: Duration,
    // 沙箱内存上限（字节）
    pub memory_limit: usize,
    // 沙箱栈上限（字节）
    pub max_stack_size: usize,
    // 超过该长度的脚本直接跳过
    pub max_script_bytes: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_millis(1000),
            memory_limit: 16 * 1024 * 1024,
            max_stack_size: 512 * 1024,
            max_script_bytes: 512 * 1024,
        }
    }
}

/// 字段匹配版本与脚本探测版本同时存在时的取舍策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptPrecedence {
    /// 字段匹配优先，仅在字段未提取到版本时采用脚本版本
    #[default]
    FieldFirst,
    /// 脚本版本优先
    ScriptFirst,
    /// 合并两者（字段版本在前，去重）
    Merge,
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 插件定义文件或目录（.json/.yml/.yaml）
    pub plugin_paths: Vec<PathBuf>,
    // 插件缓存路径（MessagePack），为空则不缓存
    pub catalog_cache_path: Option<PathBuf>,
    // 并行检测线程数，0或1表示顺序执行
    pub worker_threads: usize,
    // 脚本沙箱限制
    pub script_limits: ScriptLimits,
    // 版本来源优先级
    pub script_precedence: ScriptPrecedence,
    // 为真时每次检测的汇总以 info 级别输出，否则为 debug
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            plugin_paths: vec![PathBuf::from("plugins")],
            catalog_cache_path: None,
            worker_threads: 0,
            script_limits: ScriptLimits::default(),
            script_precedence: ScriptPrecedence::default(),
            verbose: false,
        }
    }
}

impl GlobalConfig {
    /// 是否启用线程池
    pub fn is_parallel(&self) -> bool {
        self.worker_threads > 1
    }
}

/// 配置管理器（单例）
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
    // 是否已显式指定插件路径（首次指定时替换默认路径）
    paths_set: bool,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
            paths_set: false,
        }
    }

    pub fn plugin_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.plugin_paths = paths;
        self.paths_set = true;
        self
    }

    /// 追加插件路径；首次调用时替换默认的 `plugins` 目录
    pub fn plugin_path(mut self, path: PathBuf) -> Self {
        if !self.paths_set {
            self.config.plugin_paths.clear();
            self.paths_set = true;
        }
        self.config.plugin_paths.push(path);
        self
    }

    pub fn catalog_cache_path(mut self, path: PathBuf) -> Self {
        self.config.catalog_cache_path = Some(path);
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = threads;
        self
    }

    pub fn script_limits(mut self, limits: ScriptLimits) -> Self {
        self.config.script_limits = limits;
        self
    }

    pub fn script_time_limit(mut self, limit: Duration) -> Self {
        self.config.script_limits.time_limit = limit;
        self
    }

    pub fn script_precedence(mut self, precedence: ScriptPrecedence) -> Self {
        self.config.script_precedence = precedence;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = ConfigManager::custom()
            .plugin_paths(vec![PathBuf::from("a.yml")])
            .plugin_path(PathBuf::from("b.json"))
            .worker_threads(4)
            .script_time_limit(Duration::from_millis(50))
            .script_precedence(ScriptPrecedence::Merge)
            .build();

        assert_eq!(config.plugin_paths, vec![PathBuf::from("a.yml"), PathBuf::from("b.json")]);
        assert!(config.is_parallel());
        assert_eq!(config.script_limits.time_limit, Duration::from_millis(50));
        assert_eq!(config.script_precedence, ScriptPrecedence::Merge);
        assert!(config.catalog_cache_path.is_none());
    }

    #[test]
    fn test_plugin_path_replaces_default_directory() {
        let config = ConfigManager::custom().plugin_path(PathBuf::from("x")).build();
        assert_eq!(config.plugin_paths, vec![PathBuf::from("x")]);

        let config = ConfigManager::custom()
            .plugin_path(PathBuf::from("x"))
            .plugin_path(PathBuf::from("y"))
            .build();
        assert_eq!(config.plugin_paths, vec![PathBuf::from("x"), PathBuf::from("y")]);

        // 未指定时沿用默认目录
        assert_eq!(ConfigManager::custom().build().plugin_paths, vec![PathBuf::from("plugins")]);
    }

    #[test]
    fn test_default_is_sequential() {
        let config = ConfigManager::get_default();
        assert!(!config.is_parallel());
        assert_eq!(config.script_precedence, ScriptPrecedence::FieldFirst);
    }
}
