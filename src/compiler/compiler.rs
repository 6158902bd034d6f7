//! 插件编译器核心
//! 将插件定义编译为可执行的匹配器；非法正则与缺少捕获分组在此处报错

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::pattern::{CaptureRule, CompiledMatcher, MatchTarget, Plugin, PluginCatalog, ScriptMatcher};
use crate::extractor::Field;
use crate::rule::{Category, MatcherSpec, PluginSpec};
use crate::error::{RsdResult, RsdetectemError};

/// 插件编译器
pub struct PluginCompiler;

impl PluginCompiler {
    /// 编译插件目录，任一插件非法即整体失败
    pub fn compile(specs: &[PluginSpec]) -> RsdResult<PluginCatalog> {
        let start = Instant::now();
        let mut plugins = BTreeMap::new();
        let mut stats = CompileStats::default();

        for spec in specs {
            let plugin = Self::compile_plugin(spec)?;
            if plugins.contains_key(&plugin.name) {
                return Err(RsdetectemError::DuplicatePlugin(plugin.name));
            }
            stats.record(&plugin);
            plugins.insert(plugin.name.clone(), Arc::new(plugin));
        }

        stats.log(start);
        Ok(PluginCatalog::from_map(plugins))
    }

    /// 宽松编译：跳过非法插件并返回其错误，保证其余插件可用
    pub fn compile_lenient(specs: &[PluginSpec]) -> (PluginCatalog, Vec<(String, RsdetectemError)>) {
        let start = Instant::now();
        let mut plugins = BTreeMap::new();
        let mut faults = Vec::new();
        let mut stats = CompileStats::default();

        for spec in specs {
            let compiled = Self::compile_plugin(spec).and_then(|plugin| {
                if plugins.contains_key(&plugin.name) {
                    Err(RsdetectemError::DuplicatePlugin(plugin.name))
                } else {
                    Ok(plugin)
                }
            });

            match compiled {
                Ok(plugin) => {
                    stats.record(&plugin);
                    plugins.insert(plugin.name.clone(), Arc::new(plugin));
                }
                Err(e) => {
                    warn!("插件编译失败，已跳过：{}，错误：{}", spec.name, e);
                    faults.push((spec.name.clone(), e));
                }
            }
        }

        stats.log(start);
        (PluginCatalog::from_map(plugins), faults)
    }

    /// 编译单个插件
    pub fn compile_plugin(spec: &PluginSpec) -> RsdResult<Plugin> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(RsdetectemError::PluginParseError("插件名称为空".to_string()));
        }

        let mut buckets = HashMap::new();
        for category in Category::ALL {
            let bucket = spec.bucket(category);
            for field in Field::ALL {
                let matcher_specs = bucket.get(field);
                if matcher_specs.is_empty() {
                    continue;
                }
                let compiled = matcher_specs
                    .iter()
                    .map(|m| Self::compile_matcher(name, field, category, m))
                    .collect::<RsdResult<Vec<_>>>()?;
                buckets.insert((field, category), compiled);
            }
        }

        let mut script_matchers = Vec::with_capacity(spec.js_matchers.len());
        for js in &spec.js_matchers {
            if js.check.trim().is_empty() || js.version.trim().is_empty() {
                return Err(RsdetectemError::InvalidMatcher {
                    plugin: name.to_string(),
                    reason: "脚本匹配器的 check/version 表达式不能为空".to_string(),
                });
            }
            script_matchers.push(ScriptMatcher {
                check: js.check.clone(),
                version: js.version.clone(),
            });
        }

        Ok(Plugin::new(
            name.to_string(),
            spec.homepage.clone(),
            spec.tags.clone(),
            buckets,
            script_matchers,
        ))
    }

    /// 编译单个匹配器
    fn compile_matcher(
        plugin: &str,
        field: Field,
        category: Category,
        spec: &MatcherSpec,
    ) -> RsdResult<CompiledMatcher> {
        if spec.header.is_some() && field != Field::Header {
            return Err(RsdetectemError::InvalidMatcher {
                plugin: plugin.to_string(),
                reason: format!("{} 字段的匹配器不能指定 header：{}", field, spec.pattern),
            });
        }

        // 1. 编译匹配目标，并确定产出捕获的正则
        let (target, capture_regex) = match (field, spec.header.as_deref()) {
            (Field::Header, Some(header_name)) => {
                let name = Self::compile_header_name(plugin, header_name)?;
                let value = Self::compile_regex(plugin, &spec.pattern)?;
                (MatchTarget::Header { name, value: Some(value.clone()) }, value)
            }
            (Field::Header, None) => {
                let name = Self::compile_header_name(plugin, &spec.pattern)?;
                (MatchTarget::Header { name: name.clone(), value: None }, name)
            }
            _ => {
                let regex = Self::compile_regex(plugin, &spec.pattern)?;
                (MatchTarget::Text(regex.clone()), regex)
            }
        };

        // 2. 确定片段文本提取方式
        let available = capture_regex.captures_len() - 1;
        let capture = if let Some(template) = &spec.version {
            CaptureRule::Template(template.clone())
        } else if let Some(index) = spec.group {
            if index > available {
                return Err(RsdetectemError::InvalidCaptureIndex {
                    plugin: plugin.to_string(),
                    pattern: spec.pattern.clone(),
                    index,
                    available,
                });
            }
            CaptureRule::Group(index)
        } else if available > 0 {
            CaptureRule::Group(1)
        } else {
            CaptureRule::Whole
        };

        // 3. 版本/名称类匹配器必须能提取文本
        let yields_text = match &capture {
            CaptureRule::Group(_) => true,
            CaptureRule::Template(_) => available > 0,
            CaptureRule::Whole => false,
        };
        let named = category == Category::ModularMatchers && spec.name.is_some();
        if category.requires_text() && !yields_text && !named {
            return Err(RsdetectemError::MissingCaptureGroup {
                plugin: plugin.to_string(),
                category: category.as_str(),
                pattern: spec.pattern.clone(),
            });
        }

        Ok(CompiledMatcher {
            target,
            capture,
            name: spec.name.clone(),
        })
    }

    fn compile_regex(plugin: &str, pattern: &str) -> RsdResult<Regex> {
        Regex::new(pattern).map_err(|source| RsdetectemError::RegexCompileError {
            plugin: plugin.to_string(),
            pattern: pattern.to_string(),
            source,
        })
    }

    /// Header名称：忽略大小写，整体匹配
    fn compile_header_name(plugin: &str, pattern: &str) -> RsdResult<Regex> {
        RegexBuilder::new(&format!("^(?:{})$", pattern))
            .case_insensitive(true)
            .build()
            .map_err(|source| RsdetectemError::RegexCompileError {
                plugin: plugin.to_string(),
                pattern: pattern.to_string(),
                source,
            })
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    plugin_count: usize,
    matcher_count: usize,
    script_count: usize,
}

impl CompileStats {
    fn record(&mut self, plugin: &Plugin) {
        self.plugin_count += 1;
        self.matcher_count += plugin.matcher_count();
        self.script_count += plugin.script_matchers().len();
    }

    fn log(&self, start: Instant) {
        debug!("✅ 插件编译完成，总耗时{:?}", start.elapsed());
        debug!(
            "📊 编译统计：插件{}个、字段匹配器{}条、脚本匹配器{}条",
            self.plugin_count, self.matcher_count, self.script_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jquery_spec() -> PluginSpec {
        PluginSpec::new("jquery").with_matcher(
            Category::Matchers,
            Field::Url,
            MatcherSpec::new(r"/jquery-([\d.]+?)(?:\.min)?\.js"),
        )
    }

    #[test]
    fn test_compile_buckets_and_lookup() {
        let spec = jquery_spec()
            .with_matcher(Category::Indicators, Field::Header, MatcherSpec::new("X-JQuery"))
            .with_script_matcher("window.jQuery", "window.jQuery.fn.jquery");
        let catalog = PluginCompiler::compile(&[spec]).unwrap();
        let plugin = catalog.get("jquery").unwrap();

        assert_eq!(plugin.lookup(Field::Url, Category::Matchers).len(), 1);
        assert!(plugin.lookup(Field::Body, Category::Matchers).is_empty());
        assert_eq!(plugin.fields(Category::Indicators), vec![Field::Header]);
        assert_eq!(plugin.script_matchers().len(), 1);
        assert!(!plugin.is_modular());
        assert_eq!(
            plugin.lookup(Field::Url, Category::Matchers)[0].capture,
            CaptureRule::Group(1)
        );
    }

    #[test]
    fn test_malformed_pattern_is_load_time_fault() {
        let spec = PluginSpec::new("broken").with_matcher(
            Category::Matchers,
            Field::Body,
            MatcherSpec::new(r"version ([\d.]+"),
        );
        let err = PluginCompiler::compile(&[spec]).unwrap_err();
        match &err {
            RsdetectemError::RegexCompileError { plugin, pattern, .. } => {
                assert_eq!(plugin, "broken");
                assert_eq!(pattern, r"version ([\d.]+");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_configuration_fault());
        assert!(err.to_string().contains("broken"), "{}", err);

        // Header 名称的正则同样带上插件名
        let spec = PluginSpec::new("bad-header").with_matcher(
            Category::Indicators,
            Field::Header,
            MatcherSpec::new("X-(Powered"),
        );
        let err = PluginCompiler::compile(&[spec]).unwrap_err();
        assert!(err.to_string().contains("bad-header"), "{}", err);
    }

    #[test]
    fn test_version_matcher_requires_capture_group() {
        let spec = PluginSpec::new("nocap").with_matcher(
            Category::Matchers,
            Field::Body,
            MatcherSpec::new("powered by nocap"),
        );
        assert!(matches!(
            PluginCompiler::compile_plugin(&spec),
            Err(RsdetectemError::MissingCaptureGroup { .. })
        ));

        // 指标类无需捕获；带名称的组合匹配器也无需捕获
        let spec = PluginSpec::new("nocap")
            .with_matcher(Category::Indicators, Field::Body, MatcherSpec::new("powered by nocap"))
            .with_matcher(
                Category::ModularMatchers,
                Field::Body,
                MatcherSpec::new("nocap-forms").with_name("forms"),
            );
        let plugin = PluginCompiler::compile_plugin(&spec).unwrap();
        assert!(plugin.is_modular());
    }

    #[test]
    fn test_invalid_capture_index() {
        let spec = PluginSpec::new("idx").with_matcher(
            Category::Matchers,
            Field::Url,
            MatcherSpec::new(r"/idx-(\d+)\.js").with_group(2),
        );
        assert!(matches!(
            PluginCompiler::compile_plugin(&spec),
            Err(RsdetectemError::InvalidCaptureIndex { index: 2, available: 1, .. })
        ));
    }

    #[test]
    fn test_header_option_only_on_header_field() {
        let mut matcher = MatcherSpec::new(r"(\d+)");
        matcher.header = Some("Server".to_string());
        let spec = PluginSpec::new("bad").with_matcher(Category::Matchers, Field::Url, matcher);
        assert!(matches!(
            PluginCompiler::compile_plugin(&spec),
            Err(RsdetectemError::InvalidMatcher { .. })
        ));
    }

    #[test]
    fn test_header_name_is_case_insensitive_and_anchored() {
        let spec = PluginSpec::new("x").with_matcher(
            Category::Indicators,
            Field::Header,
            MatcherSpec::new("X-Powered-By"),
        );
        let plugin = PluginCompiler::compile_plugin(&spec).unwrap();
        match &plugin.lookup(Field::Header, Category::Indicators)[0].target {
            MatchTarget::Header { name, value } => {
                assert!(name.is_match("x-powered-by"));
                assert!(!name.is_match("X-Powered-By-Extra"));
                assert!(value.is_none());
            }
            other => panic!("unexpected target: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_and_lenient_compile() {
        let broken = PluginSpec::new("broken").with_matcher(
            Category::Matchers,
            Field::Body,
            MatcherSpec::new("(unclosed"),
        );
        let specs = vec![jquery_spec(), broken, jquery_spec()];

        assert!(matches!(
            PluginCompiler::compile(&specs),
            Err(RsdetectemError::RegexCompileError { .. })
        ));

        let (catalog, faults) = PluginCompiler::compile_lenient(&specs);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["jquery"]);
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].0, "broken");
        assert!(matches!(faults[1].1, RsdetectemError::DuplicatePlugin(_)));
    }

    #[test]
    fn test_empty_script_expression_rejected() {
        let spec = PluginSpec::new("js").with_script_matcher("window.lib", " ");
        assert!(PluginCompiler::compile_plugin(&spec).is_err());
    }
}
