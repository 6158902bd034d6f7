//! 编译模块：将插件定义编译为只读的匹配器目录
pub mod pattern;
pub mod compiler;

pub use self::pattern::{
    CaptureRule, CompiledMatcher, MatchTarget, Plugin, PluginCatalog, ScriptMatcher
};
pub use self::compiler::PluginCompiler;
