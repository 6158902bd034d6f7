//! 插件加载与目录缓存集成测试
mod common;

use rsdetectem::{CatalogCache, ConfigManager, Detector, PluginLoader, RsdetectemError, Transaction};

#[tokio::test]
async fn test_load_plugin_directory() -> anyhow::Result<()> {
    let specs = PluginLoader::load_path(&common::plugin_dir()).await?;
    // 文件按名称排序：jquery.yml、servers.yml、wordpress.json
    let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["jquery", "php", "apache", "nginx", "wordpress"]);
    Ok(())
}

#[tokio::test]
async fn test_detector_from_config_writes_cache() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cache_path = dir.path().join("catalog.msgpack");
    let config = ConfigManager::custom()
        .plugin_path(common::plugin_dir())
        .catalog_cache_path(cache_path.clone())
        .build();

    let detector = Detector::from_config(config.clone()).await?;
    assert_eq!(detector.catalog().len(), 5);
    assert!(cache_path.exists());

    // 第二次初始化直接读取缓存，插件路径失效也不影响
    let cached = CatalogCache::load(&cache_path).await?;
    assert_eq!(cached, PluginLoader::load_path(&common::plugin_dir()).await?);

    let mut config = config;
    config.plugin_paths = vec![dir.path().join("missing")];
    let detector = Detector::from_config(config).await?;
    let tx = Transaction::new().with_header("Server", "Apache/2.4.57");
    assert_eq!(detector.detect(&tx).get("apache").unwrap().primary_version(), Some("2.4.57"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_plugin_file_fails_initialisation() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("bad.yml"),
        "name: bad\nmatchers:\n  body:\n    - pattern: 'no group here'\n",
    )?;
    let config = ConfigManager::custom().plugin_path(dir.path().to_path_buf()).build();

    let err = Detector::from_config(config).await.unwrap_err();
    assert!(matches!(err, RsdetectemError::MissingCaptureGroup { .. }));
    Ok(())
}
