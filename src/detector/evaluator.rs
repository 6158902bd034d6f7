//! 匹配器求值
//! 将单个匹配器作用于字段值，产出原始片段；不去重，按匹配顺序输出

use tracing::trace;

use crate::compiler::{CompiledMatcher, MatchTarget};
use crate::extractor::FieldValue;
use crate::utils::VersionExtractor;

/// 单次命中产生的原始片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFragment {
    /// 匹配器在所属桶内的序号
    pub matcher: usize,
    /// 按提取方式取出的文本（无捕获时为 None）
    pub text: Option<String>,
    /// 匹配器声明的子技术名称
    pub name: Option<String>,
}

/// 匹配器求值器
pub struct MatcherEvaluator;

impl MatcherEvaluator {
    /// 将匹配器作用于字段值
    pub fn apply(matcher: &CompiledMatcher, index: usize, value: &FieldValue<'_>) -> Vec<RawFragment> {
        let mut fragments = Vec::new();

        match (&matcher.target, value) {
            (MatchTarget::Text(regex), FieldValue::Text(text)) => {
                for captures in regex.captures_iter(text) {
                    fragments.push(Self::fragment(matcher, index, &captures));
                }
            }
            (MatchTarget::Header { name, value: value_regex }, FieldValue::Headers(headers)) => {
                // 每个名称命中的Header独立产出片段
                for (header_name, header_value) in headers.iter() {
                    let Some(name_captures) = name.captures(header_name) else {
                        continue;
                    };
                    match value_regex {
                        Some(value_regex) => {
                            for captures in value_regex.captures_iter(header_value) {
                                fragments.push(Self::fragment(matcher, index, &captures));
                            }
                        }
                        None => fragments.push(Self::fragment(matcher, index, &name_captures)),
                    }
                }
            }
            // 字段类型与匹配目标不一致时不产出
            _ => {}
        }

        if !fragments.is_empty() {
            trace!("匹配成功：规则={}，片段数={}", matcher.describe(), fragments.len());
        }
        fragments
    }

    /// 依次应用一组匹配器（保持目录顺序）
    pub fn apply_all(matchers: &[CompiledMatcher], value: &FieldValue<'_>) -> Vec<RawFragment> {
        matchers
            .iter()
            .enumerate()
            .flat_map(|(index, matcher)| Self::apply(matcher, index, value))
            .collect()
    }

    fn fragment(matcher: &CompiledMatcher, index: usize, captures: &regex::Captures) -> RawFragment {
        RawFragment {
            matcher: index,
            text: VersionExtractor::capture_text(&matcher.capture, captures),
            name: matcher.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PluginCompiler;
    use crate::extractor::Field;
    use crate::rule::{Category, MatcherSpec, PluginSpec};

    fn compile_one(field: Field, category: Category, spec: MatcherSpec) -> CompiledMatcher {
        let plugin = PluginCompiler::compile_plugin(
            &PluginSpec::new("t").with_matcher(category, field, spec),
        )
        .unwrap();
        plugin.lookup(field, category)[0].clone()
    }

    #[test]
    fn test_text_matcher_yields_fragment_per_match() {
        let matcher = compile_one(Field::Body, Category::Matchers, MatcherSpec::new(r"lib v([\d.]+)"));
        let fragments = MatcherEvaluator::apply(
            &matcher,
            0,
            &FieldValue::Text("lib v1.0 ... lib v1.0 ... lib v2.1"),
        );
        let texts: Vec<_> = fragments.iter().map(|f| f.text.clone().unwrap()).collect();
        // 不去重
        assert_eq!(texts, vec!["1.0", "1.0", "2.1"]);
    }

    #[test]
    fn test_header_matcher_checks_name_then_value() {
        let matcher = compile_one(
            Field::Header,
            Category::Matchers,
            MatcherSpec::header("x-powered-by", r"PHP/([\d.]+)"),
        );
        let headers = vec![
            ("Server".to_string(), "PHP/1.0".to_string()),
            ("X-Powered-By".to_string(), "PHP/7.4.3".to_string()),
            ("x-powered-by".to_string(), "PHP/8.1.0".to_string()),
        ];
        let fragments = MatcherEvaluator::apply(&matcher, 3, &FieldValue::Headers(&headers));
        let texts: Vec<_> = fragments.iter().map(|f| f.text.clone().unwrap()).collect();
        assert_eq!(texts, vec!["7.4.3", "8.1.0"]);
        assert!(fragments.iter().all(|f| f.matcher == 3));
    }

    #[test]
    fn test_header_name_only_matcher() {
        let matcher = compile_one(Field::Header, Category::Indicators, MatcherSpec::new("X-Powered-By"));
        let headers = vec![("x-powered-by".to_string(), "anything".to_string())];
        let fragments = MatcherEvaluator::apply(&matcher, 0, &FieldValue::Headers(&headers));
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, None);
    }

    #[test]
    fn test_mismatched_value_kind_yields_nothing() {
        let matcher = compile_one(Field::Header, Category::Indicators, MatcherSpec::new("X-Powered-By"));
        assert!(MatcherEvaluator::apply(&matcher, 0, &FieldValue::Text("X-Powered-By: X")).is_empty());
    }

    #[test]
    fn test_apply_all_keeps_catalog_order() {
        let plugin = PluginCompiler::compile_plugin(
            &PluginSpec::new("t")
                .with_matcher(Category::ModularMatchers, Field::Body, MatcherSpec::new("beta").with_name("b"))
                .with_matcher(Category::ModularMatchers, Field::Body, MatcherSpec::new("alpha").with_name("a")),
        )
        .unwrap();
        let fragments = MatcherEvaluator::apply_all(
            plugin.lookup(Field::Body, Category::ModularMatchers),
            &FieldValue::Text("alpha beta"),
        );
        let names: Vec<_> = fragments.iter().map(|f| f.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
