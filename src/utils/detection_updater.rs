//! 检测结果更新工具
//! 汇总单个插件在各字段、各类别以及脚本探测中的发现，按回退链与版本来源策略得出结论

use crate::config::ScriptPrecedence;
use crate::detector::{Detection, Evidence, EvidenceSource};
use crate::extractor::Field;
use crate::rule::Category;
use crate::utils::extraction::normalize_version;

/// 脚本探测命中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFinding {
    pub matcher: usize,
    pub version: Option<String>,
}

/// 单个插件的原始发现
#[derive(Debug, Clone, Default)]
pub struct PluginFindings {
    versions: Vec<String>,
    names: Vec<String>,
    indicated: bool,
    script: Option<ScriptFinding>,
    evidence: Vec<Evidence>,
}

impl PluginFindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录字段匹配得到的版本
    pub fn add_versions(&mut self, field: Field, matcher: usize, versions: Vec<String>) {
        for version in versions {
            self.evidence.push(Evidence {
                source: EvidenceSource::Field { field, category: Category::Matchers },
                matcher,
                value: Some(version.clone()),
            });
            push_distinct(&mut self.versions, version);
        }
    }

    /// 记录组合匹配器得到的子技术名称
    pub fn add_names(&mut self, field: Field, matcher: usize, names: Vec<String>) {
        for name in names {
            self.evidence.push(Evidence {
                source: EvidenceSource::Field { field, category: Category::ModularMatchers },
                matcher,
                value: Some(name.clone()),
            });
            push_distinct(&mut self.names, name);
        }
    }

    /// 记录指标命中
    pub fn add_indicator(&mut self, field: Field, matcher: usize) {
        self.indicated = true;
        self.evidence.push(Evidence {
            source: EvidenceSource::Field { field, category: Category::Indicators },
            matcher,
            value: None,
        });
    }

    /// 记录脚本探测命中（仅保留第一个）
    pub fn set_script(&mut self, finding: ScriptFinding) {
        if self.script.is_some() {
            return;
        }
        self.evidence.push(Evidence {
            source: EvidenceSource::Script,
            matcher: finding.matcher,
            value: finding.version.clone(),
        });
        self.script = Some(finding);
    }
}

/// 检测结果更新工具
pub struct DetectionUpdater;

impl DetectionUpdater {
    /// 回退链：版本 → 名称 → 指标；脚本命中同样视为存在
    ///
    /// 无任何发现时返回 None（插件不出现在结果中）。
    pub fn resolve(findings: PluginFindings, precedence: ScriptPrecedence) -> Option<Detection> {
        let PluginFindings { versions, names, indicated, script, evidence } = findings;

        let script_versions: Vec<String> = script
            .as_ref()
            .and_then(|finding| finding.version.as_deref())
            .map(normalize_version)
            .filter(|v| !v.is_empty())
            .into_iter()
            .collect();

        let versions = Self::merge_versions(versions, script_versions, precedence);
        let present = !versions.is_empty() || !names.is_empty() || indicated || script.is_some();
        if !present {
            return None;
        }

        Some(Detection { versions, names, evidence })
    }

    /// 字段版本与脚本版本的取舍
    pub fn merge_versions(
        field_versions: Vec<String>,
        script_versions: Vec<String>,
        precedence: ScriptPrecedence,
    ) -> Vec<String> {
        match precedence {
            ScriptPrecedence::FieldFirst if !field_versions.is_empty() => field_versions,
            ScriptPrecedence::FieldFirst => script_versions,
            ScriptPrecedence::ScriptFirst if !script_versions.is_empty() => script_versions,
            ScriptPrecedence::ScriptFirst => field_versions,
            ScriptPrecedence::Merge => {
                let mut merged = field_versions;
                for version in script_versions {
                    push_distinct(&mut merged, version);
                }
                merged
            }
        }
    }
}

fn push_distinct(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_no_findings_omits_plugin() {
        assert!(DetectionUpdater::resolve(PluginFindings::new(), ScriptPrecedence::FieldFirst).is_none());
    }

    #[test]
    fn test_fallback_chain() {
        let mut findings = PluginFindings::new();
        findings.add_names(Field::Body, 0, strings(&["forms"]));
        findings.add_indicator(Field::Header, 1);
        let detection = DetectionUpdater::resolve(findings, ScriptPrecedence::FieldFirst).unwrap();
        assert!(detection.is_version_unknown());
        assert_eq!(detection.names, strings(&["forms"]));
        assert_eq!(detection.evidence.len(), 2);

        let mut findings = PluginFindings::new();
        findings.add_indicator(Field::Url, 0);
        let detection = DetectionUpdater::resolve(findings, ScriptPrecedence::FieldFirst).unwrap();
        assert!(detection.is_version_unknown());
    }

    #[test]
    fn test_versions_across_fields_are_merged_in_order() {
        let mut findings = PluginFindings::new();
        findings.add_versions(Field::Url, 0, strings(&["1.0"]));
        findings.add_versions(Field::Body, 0, strings(&["1.1", "1.0"]));
        let detection = DetectionUpdater::resolve(findings, ScriptPrecedence::FieldFirst).unwrap();
        assert_eq!(detection.versions, strings(&["1.0", "1.1"]));
        assert_eq!(detection.primary_version(), Some("1.0"));
    }

    #[test]
    fn test_script_precedence_policies() {
        let field = strings(&["1.0"]);
        let script = strings(&["2.0"]);
        assert_eq!(
            DetectionUpdater::merge_versions(field.clone(), script.clone(), ScriptPrecedence::FieldFirst),
            strings(&["1.0"])
        );
        assert_eq!(
            DetectionUpdater::merge_versions(Vec::new(), script.clone(), ScriptPrecedence::FieldFirst),
            strings(&["2.0"])
        );
        assert_eq!(
            DetectionUpdater::merge_versions(field.clone(), script.clone(), ScriptPrecedence::ScriptFirst),
            strings(&["2.0"])
        );
        assert_eq!(
            DetectionUpdater::merge_versions(field, script, ScriptPrecedence::Merge),
            strings(&["1.0", "2.0"])
        );
    }

    #[test]
    fn test_script_hit_without_version_is_present() {
        let mut findings = PluginFindings::new();
        findings.set_script(ScriptFinding { matcher: 0, version: None });
        // 第二次命中被忽略
        findings.set_script(ScriptFinding { matcher: 1, version: Some("9".to_string()) });
        let detection = DetectionUpdater::resolve(findings, ScriptPrecedence::FieldFirst).unwrap();
        assert!(detection.is_version_unknown());
        assert_eq!(detection.evidence[0].source, EvidenceSource::Script);
    }
}
