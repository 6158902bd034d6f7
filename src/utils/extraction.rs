//! 提取函数
//! 将原始片段转换为语义值：版本号列表、子技术名称列表或存在标记

use crate::detector::RawFragment;

/// 版本号两端需要去掉的分隔符
const VERSION_SEPARATORS: &[char] = &['.', '-', '_', '/', ',', ';', ':'];

/// 提取函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    Version,
    Name,
    Presence,
}

/// 提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Versions(Vec<String>),
    Names(Vec<String>),
    Presence(bool),
}

impl Extracted {
    /// 期望值是否在结果中（存在标记忽略期望值）
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Extracted::Versions(values) | Extracted::Names(values) => values.iter().any(|v| v == expected),
            Extracted::Presence(present) => *present,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Extracted::Versions(values) | Extracted::Names(values) => values.is_empty(),
            Extracted::Presence(present) => !present,
        }
    }
}

impl Extraction {
    pub fn run(&self, fragments: &[RawFragment]) -> Extracted {
        match self {
            Extraction::Version => Extracted::Versions(extract_version(fragments)),
            Extraction::Name => Extracted::Names(extract_name(fragments)),
            Extraction::Presence => Extracted::Presence(check_presence(fragments)),
        }
    }
}

/// 规范化版本号：去掉两端空白与分隔符
pub fn normalize_version(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c.is_whitespace() || VERSION_SEPARATORS.contains(&c))
        .to_string()
}

/// 提取去重后的非空版本号，保持发现顺序
pub fn extract_version(fragments: &[RawFragment]) -> Vec<String> {
    let candidates = fragments
        .iter()
        .filter_map(|fragment| fragment.text.as_deref())
        .map(normalize_version);
    distinct_non_empty(candidates)
}

/// 提取去重后的子技术名称（优先匹配器声明的名称），保持发现顺序
pub fn extract_name(fragments: &[RawFragment]) -> Vec<String> {
    let candidates = fragments.iter().filter_map(|fragment| {
        fragment
            .name
            .as_deref()
            .or(fragment.text.as_deref())
            .map(|name| name.trim().to_string())
    });
    distinct_non_empty(candidates)
}

/// 至少有一个片段即视为存在
pub fn check_presence(fragments: &[RawFragment]) -> bool {
    !fragments.is_empty()
}

fn distinct_non_empty(candidates: impl Iterator<Item = String>) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for candidate in candidates {
        if !candidate.is_empty() && !values.contains(&candidate) {
            values.push(candidate);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: Option<&str>, name: Option<&str>) -> RawFragment {
        RawFragment {
            matcher: 0,
            text: text.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_extract_version_normalizes_and_dedupes() {
        let fragments = vec![
            fragment(Some(" 3.6.0. "), None),
            fragment(Some("3.6.0"), None),
            fragment(Some("-2.1_"), None),
            fragment(Some("..."), None),
            fragment(None, None),
        ];
        assert_eq!(extract_version(&fragments), vec!["3.6.0", "2.1"]);
    }

    #[test]
    fn test_extract_name_prefers_declared_name() {
        let fragments = vec![
            fragment(Some("ignored"), Some("forms")),
            fragment(Some(" gallery "), None),
            fragment(None, Some("forms")),
            fragment(None, None),
        ];
        assert_eq!(extract_name(&fragments), vec!["forms", "gallery"]);
    }

    #[test]
    fn test_check_presence_ignores_content() {
        assert!(check_presence(&[fragment(None, None)]));
        assert!(!check_presence(&[]));
    }

    #[test]
    fn test_membership_acceptance() {
        let extracted = Extraction::Version.run(&[fragment(Some("1.0"), None), fragment(Some("1.1"), None)]);
        assert!(extracted.contains("1.1"));
        assert!(!extracted.contains("1.2"));
        assert!(Extraction::Presence.run(&[]).is_empty());
    }
}
