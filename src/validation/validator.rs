//! 样例一致性校验
//! 对每条样例构造只含单一字段的事务，运行对应流水线，以"期望值在结果集合中"为通过标准

use std::fmt;
use tracing::debug;

use super::fixture::{FieldExample, FixtureEntry, ModularExample, ScriptExample};
use crate::compiler::{Plugin, PluginCatalog};
use crate::detector::{Detector, ScriptProbe};
use crate::error::RsdResult;
use crate::rule::Category;
use crate::utils::Extraction;

/// 样例类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    Matches,
    JsMatches,
    ModularMatches,
    Indicators,
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixtureKind::Matches => "matches",
            FixtureKind::JsMatches => "js_matches",
            FixtureKind::ModularMatches => "modular_matches",
            FixtureKind::Indicators => "indicators",
        })
    }
}

/// 单条样例校验失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub plugin: String,
    pub kind: FixtureKind,
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}[{}]：{}", self.plugin, self.kind, self.index, self.reason)
    }
}

/// 校验报告
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub checked: usize,
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 样例校验器
pub struct FixtureValidator<'a> {
    catalog: &'a PluginCatalog,
    probe: ScriptProbe,
}

impl<'a> FixtureValidator<'a> {
    pub fn new(catalog: &'a PluginCatalog) -> Self {
        Self {
            catalog,
            probe: ScriptProbe::default(),
        }
    }

    pub fn with_probe(mut self, probe: ScriptProbe) -> Self {
        self.probe = probe;
        self
    }

    /// 校验全部样例
    pub fn validate(&self, fixtures: &[FixtureEntry]) -> ValidationReport {
        let mut report = ValidationReport::default();
        for entry in fixtures {
            self.validate_entry(entry, &mut report);
        }
        debug!("样例校验完成：共{}条，失败{}条", report.checked, report.failures.len());
        report
    }

    fn validate_entry(&self, entry: &FixtureEntry, report: &mut ValidationReport) {
        let plugin = self.catalog.get(&entry.plugin);

        let mut record = |kind: FixtureKind, index: usize, outcome: Result<(), String>| {
            report.checked += 1;
            if let Err(reason) = outcome {
                report.failures.push(ValidationFailure {
                    plugin: entry.plugin.clone(),
                    kind,
                    index,
                    reason,
                });
            }
        };

        let Some(plugin) = plugin else {
            let kinds = [
                (FixtureKind::Matches, entry.matches.len()),
                (FixtureKind::JsMatches, entry.js_matches.len()),
                (FixtureKind::ModularMatches, entry.modular_matches.len()),
                (FixtureKind::Indicators, entry.indicators.len()),
            ];
            for (kind, count) in kinds {
                for index in 0..count {
                    record(kind, index, Err("插件不存在".to_string()));
                }
            }
            return;
        };

        for (index, example) in entry.matches.iter().enumerate() {
            record(FixtureKind::Matches, index, flatten(self.check_match(plugin, example)));
        }
        for (index, example) in entry.js_matches.iter().enumerate() {
            record(FixtureKind::JsMatches, index, flatten(self.check_js_match(plugin, example)));
        }
        for (index, example) in entry.modular_matches.iter().enumerate() {
            record(FixtureKind::ModularMatches, index, flatten(self.check_modular_match(plugin, example)));
        }
        for (index, example) in entry.indicators.iter().enumerate() {
            record(FixtureKind::Indicators, index, flatten(self.check_indicator(plugin, example)));
        }
    }

    /// 版本样例：期望版本必须出现在提取结果中
    pub fn check_match(&self, plugin: &Plugin, example: &FieldExample) -> RsdResult<Result<(), String>> {
        let Some(expected) = example.version.as_deref() else {
            return Ok(Err("matches 样例缺少 version".to_string()));
        };
        let field = example.sample.primary_field()?;
        let tx = example.sample.transaction(field)?;
        let extracted = Detector::extract_with(&tx, plugin, field, Category::Matchers, Extraction::Version)?;

        if extracted.contains(expected) {
            Ok(Ok(()))
        } else {
            Ok(Err(format!("{} 字段未提取到版本 {}，结果：{:?}", field, expected, extracted)))
        }
    }

    /// 脚本样例：第一个命中的脚本匹配器给出的版本必须等于期望值
    pub fn check_js_match(&self, plugin: &Plugin, example: &ScriptExample) -> RsdResult<Result<(), String>> {
        let version = self
            .probe
            .probe_asserted(&plugin.name, &[example.js.as_str()], plugin.script_matchers())?;
        match version {
            Some(version) if version == example.version => Ok(Ok(())),
            other => Ok(Err(format!("期望版本 {}，实际：{:?}", example.version, other))),
        }
    }

    /// 组合样例：名称或版本任一在声明字段上命中即通过
    pub fn check_modular_match(&self, plugin: &Plugin, example: &ModularExample) -> RsdResult<Result<(), String>> {
        let mut searches = vec![(example.software.as_str(), Category::ModularMatchers, Extraction::Name)];
        if let Some(version) = example.version.as_deref() {
            searches.push((version, Category::Matchers, Extraction::Version));
        }

        for (expected, category, extraction) in &searches {
            for field in example.sample.fields() {
                let tx = example.sample.transaction(field)?;
                let extracted = Detector::extract_with(&tx, plugin, field, *category, *extraction)?;
                if extracted.contains(*expected) {
                    return Ok(Ok(()));
                }
            }
        }

        let expected: Vec<&str> = searches.iter().map(|(expected, _, _)| *expected).collect();
        Ok(Err(format!("名称与版本均未提取到：{:?}", expected)))
    }

    /// 指标样例：存在判断必须为真
    pub fn check_indicator(&self, plugin: &Plugin, example: &FieldExample) -> RsdResult<Result<(), String>> {
        let field = example.sample.primary_field()?;
        let tx = example.sample.transaction(field)?;
        let extracted = Detector::extract_with(&tx, plugin, field, Category::Indicators, Extraction::Presence)?;
        if extracted.is_empty() {
            Ok(Err(format!("{} 字段未命中任何指标", field)))
        } else {
            Ok(Ok(()))
        }
    }
}

/// 配置类错误同样计为校验失败
fn flatten(outcome: RsdResult<Result<(), String>>) -> Result<(), String> {
    outcome.unwrap_or_else(|e| Err(e.to_string()))
}
