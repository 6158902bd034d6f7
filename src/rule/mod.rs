//! 规则模块：负责插件定义的数据模型、加载与缓存
pub mod model;
pub mod cache;
pub mod loader;

// 导出核心接口
pub use self::model::{
    Category, FieldMatchers, MatcherSpec, PluginSpec, ScriptMatcherSpec
};
pub use self::loader::{PluginLoader, PluginFileType};
pub use self::cache::CatalogCache;
