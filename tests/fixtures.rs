//! 插件样例一致性测试：tests/data/fixtures.yml 中的每条样例都必须通过
mod common;

use rsdetectem::validation::{load_fixture_path, FixtureKind};
use rsdetectem::FixtureValidator;

#[tokio::test]
async fn test_bundled_fixtures_pass() -> anyhow::Result<()> {
    common::init_tracing();
    let catalog = common::test_catalog().await?;
    let fixtures = load_fixture_path(&common::data_dir().join("fixtures.yml")).await?;

    let report = FixtureValidator::new(&catalog).validate(&fixtures);
    for failure in &report.failures {
        eprintln!("{}", failure);
    }
    assert!(report.is_success());
    assert_eq!(report.checked, 13);
    Ok(())
}

#[tokio::test]
async fn test_every_plugin_has_fixtures() -> anyhow::Result<()> {
    let catalog = common::test_catalog().await?;
    let fixtures = load_fixture_path(&common::data_dir().join("fixtures.yml")).await?;

    for name in catalog.names() {
        assert!(
            fixtures.iter().any(|entry| entry.plugin == name && entry.example_count() > 0),
            "插件 {} 缺少样例",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_unresolved_script_matchers_fail_validation() -> anyhow::Result<()> {
    let catalog = common::test_catalog().await?;
    let fixtures = rsdetectem::validation::load_fixtures_yaml(
        r#"
- plugin: jquery
  js_matches:
    - js: "window.Zepto = {};"
      version: 1.0.0
"#,
    )?;

    let report = FixtureValidator::new(&catalog).validate(&fixtures);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FixtureKind::JsMatches);
    assert!(report.failures[0].reason.contains("jquery"));
    Ok(())
}
