//! 检测模块：匹配器求值、脚本探测与检测编排
pub mod evaluator;
pub mod script;
pub mod result;
pub mod global;
pub mod detector;

// 导出核心接口
pub use self::evaluator::{MatcherEvaluator, RawFragment};
pub use self::script::{ProbeOutcome, ScriptProbe};
pub use self::result::{Detection, DetectionResult, Evidence, EvidenceSource, MissingFieldNotice, PluginFault};
pub use self::global::{
    detect_transaction, get_global_detector, init_rsdetectem, init_rsdetectem_with_catalog,
    init_rsdetectem_with_config,
};
pub use self::detector::Detector;
