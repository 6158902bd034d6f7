//! rsdetectem - 基于插件的网页技术与版本检测引擎
//!
//! 插件以纯数据描述（正则匹配器 + 可选脚本探测表达式），加载时统一编译，
//! 检测时对 HTTP 事务的 url / body / header 字段逐一求值。

// 导出全局错误类型
pub use self::error::{RsdetectemError, RsdResult};

// 导出配置模块
pub use self::config::{
    GlobalConfig, ConfigManager, CustomConfigBuilder, ScriptLimits, ScriptPrecedence
};

// 导出规则模块核心接口
pub use self::rule::{
    Category, MatcherSpec, PluginSpec, ScriptMatcherSpec, PluginLoader, CatalogCache
};

// 导出提取模块核心接口
pub use self::extractor::{Field, Transaction, FieldExtractor, HtmlExtractor, HarEntry};

// 导出工具模块核心接口
pub use self::utils::{
    VersionExtractor, HeaderConverter, DetectionUpdater, Extraction, Extracted
};

// 导出编译模块核心接口
pub use self::compiler::{Plugin, PluginCatalog, PluginCompiler, CompiledMatcher};

// 导出检测模块核心接口
pub use self::detector::{
    Detector,
    Detection,
    DetectionResult,
    MissingFieldNotice,
    ScriptProbe,
    ProbeOutcome,
    init_rsdetectem,
    init_rsdetectem_with_config,
    init_rsdetectem_with_catalog,
    get_global_detector,
    detect_transaction,
};

// 导出校验模块核心接口
pub use self::validation::{FixtureValidator, FixtureEntry, ValidationReport};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod extractor;
pub mod utils;
pub mod compiler;
pub mod detector;
pub mod validation;
