//! 工具模块：捕获文本提取、提取函数、结果汇总、Header转换
pub mod version_extractor;
pub mod extraction;
pub mod detection_updater;
pub mod header_converter;

pub use self::version_extractor::VersionExtractor;
pub use self::extraction::{
    check_presence, extract_name, extract_version, normalize_version, Extracted, Extraction
};
pub use self::detection_updater::{DetectionUpdater, PluginFindings, ScriptFinding};
pub use self::header_converter::HeaderConverter;
