//! 插件定义数据模型
//! 仅存储插件原始数据（未编译），无任何业务逻辑，支持序列化/反序列化

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::extractor::Field;

/// 匹配器类别：决定提取的事实类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// 提取版本号
    Matchers,
    /// 提取子技术名称（组合插件）
    ModularMatchers,
    /// 仅判断是否存在
    Indicators,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Matchers, Category::ModularMatchers, Category::Indicators];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Matchers => "matchers",
            Category::ModularMatchers => "modular_matchers",
            Category::Indicators => "indicators",
        }
    }

    /// 该类别的匹配器是否必须能提取文本
    pub fn requires_text(&self) -> bool {
        !matches!(self, Category::Indicators)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条匹配器定义
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatcherSpec {
    /// 正则：url/body 作用于文本；header 设置了 `header` 时作用于头的值，否则作用于头名称
    pub pattern: String,
    /// Header名称正则（忽略大小写，整体匹配），仅 header 字段可用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// 子技术名称（命中即视为该名称）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 提取的捕获分组序号，默认1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    /// 提取模板，支持 \1 或 $1 分组引用，优先于 group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl MatcherSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Header匹配器：名称 + 值正则
    pub fn header(name: impl Into<String>, value_pattern: impl Into<String>) -> Self {
        Self {
            pattern: value_pattern.into(),
            header: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.version = Some(template.into());
        self
    }
}

/// 按字段分组的匹配器列表（字段为外层键）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldMatchers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url: Vec<MatcherSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<MatcherSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<MatcherSpec>,
}

impl FieldMatchers {
    pub fn get(&self, field: Field) -> &[MatcherSpec] {
        match field {
            Field::Url => &self.url,
            Field::Body => &self.body,
            Field::Header => &self.header,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut Vec<MatcherSpec> {
        match field {
            Field::Url => &mut self.url,
            Field::Body => &mut self.body,
            Field::Header => &mut self.header,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_empty() && self.body.is_empty() && self.header.is_empty()
    }

    pub fn len(&self) -> usize {
        self.url.len() + self.body.len() + self.header.len()
    }
}

/// 脚本匹配器：check 表达式非 null/undefined 即存在，再求值 version 表达式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMatcherSpec {
    pub check: String,
    pub version: String,
}

/// 插件定义（从 JSON/YAML 解析）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    // 检测规则
    #[serde(default, skip_serializing_if = "FieldMatchers::is_empty")]
    pub matchers: FieldMatchers,
    #[serde(default, skip_serializing_if = "FieldMatchers::is_empty")]
    pub modular_matchers: FieldMatchers,
    #[serde(default, skip_serializing_if = "FieldMatchers::is_empty")]
    pub indicators: FieldMatchers,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub js_matchers: Vec<ScriptMatcherSpec>,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn bucket(&self, category: Category) -> &FieldMatchers {
        match category {
            Category::Matchers => &self.matchers,
            Category::ModularMatchers => &self.modular_matchers,
            Category::Indicators => &self.indicators,
        }
    }

    pub fn bucket_mut(&mut self, category: Category) -> &mut FieldMatchers {
        match category {
            Category::Matchers => &mut self.matchers,
            Category::ModularMatchers => &mut self.modular_matchers,
            Category::Indicators => &mut self.indicators,
        }
    }

    /// 追加一条匹配器（构造测试插件时使用）
    pub fn with_matcher(mut self, category: Category, field: Field, matcher: MatcherSpec) -> Self {
        self.bucket_mut(category).get_mut(field).push(matcher);
        self
    }

    pub fn with_script_matcher(mut self, check: impl Into<String>, version: impl Into<String>) -> Self {
        self.js_matchers.push(ScriptMatcherSpec {
            check: check.into(),
            version: version.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_spec_from_yaml() {
        let yaml = r#"
name: php
homepage: https://secure.php.net/
matchers:
  header:
    - header: X-Powered-By
      pattern: 'PHP/([\d.]+)'
indicators:
  header:
    - pattern: X-Powered-By
"#;
        let spec: PluginSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.name, "php");
        assert_eq!(spec.matchers.header.len(), 1);
        assert_eq!(spec.matchers.header[0].header.as_deref(), Some("X-Powered-By"));
        assert!(spec.matchers.url.is_empty());
        assert_eq!(spec.bucket(Category::Indicators).len(), 1);
        assert!(spec.js_matchers.is_empty());
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::ModularMatchers).unwrap();
        assert_eq!(json, "\"modular_matchers\"");
        assert!(!Category::Indicators.requires_text());
    }
}
