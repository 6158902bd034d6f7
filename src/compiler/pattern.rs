//! 编译后插件模型
//! 正则在加载期编译完成，检测期只读共享

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use regex::Regex;

use crate::extractor::Field;
use crate::rule::Category;

/// 匹配目标
#[derive(Debug, Clone)]
pub enum MatchTarget {
    /// url / body 文本正则
    Text(Regex),
    /// 先匹配Header名称，命中后再匹配值（无值正则时名称命中即产出片段）
    Header { name: Regex, value: Option<Regex> },
}

/// 片段文本的提取方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRule {
    /// 取指定捕获分组（0为整体匹配）
    Group(usize),
    /// 按模板渲染（\1 / $1 引用）
    Template(String),
    /// 无捕获，仅表示命中
    Whole,
}

/// 编译后的匹配器
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    pub target: MatchTarget,
    pub capture: CaptureRule,
    pub name: Option<String>,
}

impl CompiledMatcher {
    /// 规则描述（日志用）
    pub fn describe(&self) -> String {
        match &self.target {
            MatchTarget::Text(regex) => regex.as_str().to_string(),
            MatchTarget::Header { name, value: Some(value) } => {
                format!("{} => {}", name.as_str(), value.as_str())
            }
            MatchTarget::Header { name, value: None } => name.as_str().to_string(),
        }
    }
}

/// 编译后的脚本匹配器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMatcher {
    pub check: String,
    pub version: String,
}

/// 编译后的插件
#[derive(Debug, Clone)]
pub struct Plugin {
    pub name: String,
    pub homepage: Option<String>,
    pub tags: Vec<String>,
    buckets: HashMap<(Field, Category), Vec<CompiledMatcher>>,
    script_matchers: Vec<ScriptMatcher>,
}

impl Plugin {
    pub(crate) fn new(
        name: String,
        homepage: Option<String>,
        tags: Vec<String>,
        buckets: HashMap<(Field, Category), Vec<CompiledMatcher>>,
        script_matchers: Vec<ScriptMatcher>,
    ) -> Self {
        Self {
            name,
            homepage,
            tags,
            buckets,
            script_matchers,
        }
    }

    /// 查询 (字段, 类别) 下的有序匹配器，未定义时返回空切片
    pub fn lookup(&self, field: Field, category: Category) -> &[CompiledMatcher] {
        self.buckets
            .get(&(field, category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 脚本匹配器（声明顺序）
    pub fn script_matchers(&self) -> &[ScriptMatcher] {
        &self.script_matchers
    }

    /// 该类别下定义了匹配器的字段（固定顺序 url、body、header）
    pub fn fields(&self, category: Category) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| !self.lookup(*field, category).is_empty())
            .collect()
    }

    /// 是否为组合插件（通过名称识别子技术）
    pub fn is_modular(&self) -> bool {
        !self.fields(Category::ModularMatchers).is_empty()
    }

    pub fn has_script_matchers(&self) -> bool {
        !self.script_matchers.is_empty()
    }

    /// 匹配器总数
    pub fn matcher_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// 编译后的插件目录（按名称排序，加载后只读）
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    plugins: BTreeMap<String, Arc<Plugin>>,
}

impl PluginCatalog {
    pub(crate) fn from_map(plugins: BTreeMap<String, Arc<Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Plugin>> {
        self.plugins.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Plugin>> {
        self.plugins.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
