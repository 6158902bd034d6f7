//! 全局错误类型定义
//! 配置类错误（插件编写缺陷）与运行时错误分开建模；未匹配不是错误

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use serde_yaml::Error as SerdeYamlError;
use std::io::Error as IoError;

use crate::extractor::Field;

#[derive(Error, Debug)]
pub enum RsdetectemError {
    // 插件加载相关错误
    #[error("插件加载失败：{0}")]
    PluginLoadError(String),
    #[error("插件解析失败：{0}")]
    PluginParseError(String),
    #[error("插件重复定义：{0}")]
    DuplicatePlugin(String),
    #[error("插件缓存失败：{0}")]
    CatalogCacheError(String),

    // 编译相关错误（加载期配置错误）
    #[error("插件 {plugin} 的正则编译失败：{pattern}：{source}")]
    RegexCompileError {
        plugin: String,
        pattern: String,
        #[source]
        source: RegexError,
    },
    #[error("插件 {plugin} 的匹配器无效：{reason}")]
    InvalidMatcher { plugin: String, reason: String },
    #[error("插件 {plugin} 的 {category} 匹配器缺少捕获分组：{pattern}")]
    MissingCaptureGroup {
        plugin: String,
        category: &'static str,
        pattern: String,
    },
    #[error("插件 {plugin} 的捕获分组序号 {index} 超出范围（共 {available} 个分组）：{pattern}")]
    InvalidCaptureIndex {
        plugin: String,
        pattern: String,
        index: usize,
        available: usize,
    },

    // 检测相关错误
    #[error("事务缺少字段：{0}")]
    MissingField(Field),
    #[error("未知插件：{0}")]
    UnknownPlugin(String),
    #[error("插件 {0} 的脚本匹配器未产生任何结果")]
    ScriptMatchersUnresolved(String),
    #[error("脚本沙箱创建失败：{0}")]
    SandboxError(String),
    #[error("检测器未初始化")]
    DetectorNotInitialized,

    // 校验样例相关错误
    #[error("校验样例无效：{0}")]
    FixtureError(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("YAML解析失败：{0}")]
    YamlError(#[from] SerdeYamlError),
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPackError(String),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

impl RsdetectemError {
    /// 是否属于插件编写缺陷（加载期/配置类错误）
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            RsdetectemError::RegexCompileError { .. }
                | RsdetectemError::InvalidMatcher { .. }
                | RsdetectemError::MissingCaptureGroup { .. }
                | RsdetectemError::InvalidCaptureIndex { .. }
                | RsdetectemError::DuplicatePlugin(_)
                | RsdetectemError::MissingField(_)
                | RsdetectemError::ScriptMatchersUnresolved(_)
        )
    }
}

// 全局Result类型
pub type RsdResult<T> = Result<T, RsdetectemError>;
