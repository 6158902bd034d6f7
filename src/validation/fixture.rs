//! 校验样例数据模型
//! 每个插件的样例分为 matches / js_matches / modular_matches / indicators 四类，
//! 每条样例只针对 url、body、header 中的一个字段

use std::path::{Path, PathBuf};
use serde::Deserialize;

use crate::error::{RsdResult, RsdetectemError};
use crate::extractor::{Field, Transaction};

/// Header样例
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderSample {
    pub name: String,
    pub value: String,
}

/// 字段样例（url / body / header）
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FieldSample {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub header: Option<HeaderSample>,
}

impl FieldSample {
    /// 样例声明的字段（固定顺序 body、url、header）
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.body.is_some() {
            fields.push(Field::Body);
        }
        if self.url.is_some() {
            fields.push(Field::Url);
        }
        if self.header.is_some() {
            fields.push(Field::Header);
        }
        fields
    }

    /// 第一个声明的字段
    pub fn primary_field(&self) -> RsdResult<Field> {
        self.fields()
            .first()
            .copied()
            .ok_or_else(|| RsdetectemError::FixtureError("样例未声明 url/body/header 字段".to_string()))
    }

    /// 构造仅包含该字段的事务
    pub fn transaction(&self, field: Field) -> RsdResult<Transaction> {
        let missing = || RsdetectemError::FixtureError(format!("样例未声明字段：{}", field));
        Ok(match field {
            Field::Url => Transaction::new().with_url(self.url.clone().ok_or_else(missing)?),
            Field::Body => Transaction::new().with_body(self.body.clone().ok_or_else(missing)?),
            Field::Header => {
                let header = self.header.as_ref().ok_or_else(missing)?;
                Transaction::new().with_header(header.name.clone(), header.value.clone())
            }
        })
    }
}

/// matches / indicators 样例
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldExample {
    #[serde(flatten)]
    pub sample: FieldSample,
    #[serde(default, deserialize_with = "deserialize_opt_version")]
    pub version: Option<String>,
}

/// js_matches 样例
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptExample {
    pub js: String,
    #[serde(deserialize_with = "deserialize_version")]
    pub version: String,
}

/// modular_matches 样例
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModularExample {
    #[serde(flatten)]
    pub sample: FieldSample,
    pub software: String,
    /// 可省略：只校验名称
    #[serde(default, deserialize_with = "deserialize_opt_version")]
    pub version: Option<String>,
}

/// 单个插件的全部样例
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FixtureEntry {
    pub plugin: String,
    #[serde(default)]
    pub matches: Vec<FieldExample>,
    #[serde(default)]
    pub js_matches: Vec<ScriptExample>,
    #[serde(default)]
    pub modular_matches: Vec<ModularExample>,
    #[serde(default)]
    pub indicators: Vec<FieldExample>,
}

impl FixtureEntry {
    pub fn example_count(&self) -> usize {
        self.matches.len() + self.js_matches.len() + self.modular_matches.len() + self.indicators.len()
    }
}

/// 解析YAML样例文本（条目列表）
pub fn load_fixtures_yaml(content: &str) -> RsdResult<Vec<FixtureEntry>> {
    Ok(serde_yaml::from_str(content)?)
}

/// 加载样例文件，或目录下全部 .yml/.yaml 文件（按文件名排序）
pub async fn load_fixture_path(path: &Path) -> RsdResult<Vec<FixtureEntry>> {
    let metadata = tokio::fs::metadata(path).await?;
    let mut files: Vec<PathBuf> = Vec::new();
    if metadata.is_dir() {
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            let is_yaml = entry_path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
                .unwrap_or(false);
            if is_yaml {
                files.push(entry_path);
            }
        }
        files.sort();
    } else {
        files.push(path.to_path_buf());
    }

    let mut fixtures = Vec::new();
    for file in &files {
        let content = tokio::fs::read_to_string(file).await?;
        let entries = load_fixtures_yaml(&content)
            .map_err(|e| RsdetectemError::FixtureError(format!("{}：{}", file.display(), e)))?;
        fixtures.extend(entries);
    }
    Ok(fixtures)
}

/// 版本号允许写成字符串或数字（YAML 中 `version: 1.2` 会被解析为数字）
fn deserialize_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct VersionVisitor;

    impl<'de> Visitor<'de> for VersionVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a version string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(VersionVisitor)
}

fn deserialize_opt_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_version(deserializer).map(Some)
}
