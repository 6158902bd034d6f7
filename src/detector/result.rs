//! 检测结果模型

use std::collections::BTreeMap;
use std::fmt;
use serde::Serialize;

use crate::extractor::Field;
use crate::rule::Category;

/// 证据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceSource {
    Field { field: Field, category: Category },
    Script,
}

/// 单条命中证据：来源 + 匹配器序号 + 提取值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub source: EvidenceSource,
    pub matcher: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// 单个插件的检测结论
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Detection {
    /// 候选版本（发现顺序），为空表示"存在但版本未知"
    pub versions: Vec<String>,
    /// 组合插件识别出的子技术名称
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    pub evidence: Vec<Evidence>,
}

impl Detection {
    pub fn is_version_unknown(&self) -> bool {
        self.versions.is_empty()
    }

    /// 先发现者优先的版本
    pub fn primary_version(&self) -> Option<&str> {
        self.versions.first().map(String::as_str)
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.versions.is_empty() {
            f.write_str("present")
        } else {
            f.write_str(&self.versions.join(", "))
        }
    }
}

/// 插件级故障（不影响其余插件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginFault {
    pub plugin: String,
    pub message: String,
}

/// 插件声明了匹配器、但事务未填充的字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFieldNotice {
    pub plugin: String,
    pub field: Field,
}

impl fmt::Display for MissingFieldNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "插件 {} 需要的字段缺失：{}", self.plugin, self.field)
    }
}

/// 一次检测的完整结果
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DetectionResult {
    detections: BTreeMap<String, Detection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    faults: Vec<PluginFault>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_fields: Vec<MissingFieldNotice>,
}

impl DetectionResult {
    pub(crate) fn new(
        detections: BTreeMap<String, Detection>,
        faults: Vec<PluginFault>,
        missing_fields: Vec<MissingFieldNotice>,
    ) -> Self {
        Self { detections, faults, missing_fields }
    }

    pub fn get(&self, plugin: &str) -> Option<&Detection> {
        self.detections.get(plugin)
    }

    pub fn contains(&self, plugin: &str) -> bool {
        self.detections.contains_key(plugin)
    }

    /// 按插件名称排序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Detection)> {
        self.detections.iter().map(|(name, detection)| (name.as_str(), detection))
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn faults(&self) -> &[PluginFault] {
        &self.faults
    }

    /// 因事务缺少字段而未能求值的 (插件, 字段)，按插件名称排序
    pub fn missing_fields(&self) -> &[MissingFieldNotice] {
        &self.missing_fields
    }

    /// 指定插件缺失的字段
    pub fn missing_fields_of(&self, plugin: &str) -> Vec<Field> {
        self.missing_fields
            .iter()
            .filter(|m| m.plugin == plugin)
            .map(|m| m.field)
            .collect()
    }
}
