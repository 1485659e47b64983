use anyhow::Result;
use lambda_sqs_etl::adapters::metrics::LogMetrics;
use lambda_sqs_etl::{
    EtlEngine, EtlError, ListPagesState, LocalStore, MemoryMetrics, PipelineSettings,
};
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, key: &str, content: &str) -> Result<()> {
    let path = root.join(key);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// 完整流程：目錄 -> 分頁 -> 拆分 -> 攤平 -> 目的目錄
#[tokio::test]
async fn test_end_to_end_flattens_nested_tree() -> Result<()> {
    let source = TempDir::new()?;
    let destination = TempDir::new()?;

    write(
        source.path(),
        "2024/01/orders.json",
        concat!(
            r#"{"id":1,"customer":{"name":"Ada","address":{"city":"London"}},"items":[{"sku":"A"}]}"#,
            "\n",
            r#"{"id":2,"customer":{"name":"Bob","address":{"city":"Paris"}},"items":[]}"#,
            "\n"
        ),
    )?;
    write(source.path(), "2024/02/orders.json", r#"{"id":3,"meta":{"v":2}}"#)?;
    write(source.path(), "readme.json", "")?;

    let metrics = MemoryMetrics::new();
    let settings = PipelineSettings {
        page_size: 2,
        ..Default::default()
    };
    let engine = EtlEngine::new(
        LocalStore::new(source.path()),
        LocalStore::new(destination.path()),
        metrics.clone(),
        settings,
    );

    let summary = engine.run(ListPagesState::default()).await?;

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.keys_enqueued, 3);
    assert_eq!(summary.objects_transformed, 3);
    assert_eq!(summary.lines_processed, 3);

    let january = std::fs::read_to_string(destination.path().join("2024/01/orders.json"))?;
    let lines: Vec<&str> = january.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"{"id":1,"customer.name":"Ada","customer.address.city":"London","items":[{"sku":"A"}]}"#,
            r#"{"id":2,"customer.name":"Bob","customer.address.city":"Paris","items":[]}"#,
        ]
    );
    assert!(!january.ends_with('\n'));

    let february = std::fs::read_to_string(destination.path().join("2024/02/orders.json"))?;
    assert_eq!(february, r#"{"id":3,"meta.v":2}"#);

    let readme = std::fs::read(destination.path().join("readme.json"))?;
    assert!(readme.is_empty());

    assert_eq!(metrics.total("S3ObjectsProcessed"), 3.0);
    assert_eq!(metrics.total("LinesProcessed"), 3.0);
    Ok(())
}

#[tokio::test]
async fn test_custom_separator() -> Result<()> {
    let source = TempDir::new()?;
    let destination = TempDir::new()?;
    write(source.path(), "a.json", r#"{"x":{"y":{"z":true}}}"#)?;

    let settings = PipelineSettings {
        flatten_separator: "__".to_string(),
        ..Default::default()
    };
    let engine = EtlEngine::new(
        LocalStore::new(source.path()),
        LocalStore::new(destination.path()),
        LogMetrics,
        settings,
    );
    engine.run(ListPagesState::default()).await?;

    let output = std::fs::read_to_string(destination.path().join("a.json"))?;
    assert_eq!(output, r#"{"x__y__z":true}"#);
    Ok(())
}

#[tokio::test]
async fn test_empty_source_directory() -> Result<()> {
    let source = TempDir::new()?;
    let destination = TempDir::new()?;

    let engine = EtlEngine::new(
        LocalStore::new(source.path()),
        LocalStore::new(destination.path()),
        LogMetrics,
        PipelineSettings::default(),
    );
    let summary = engine.run(ListPagesState::default()).await?;

    assert_eq!(summary.list_invocations, 1);
    assert_eq!(summary.pages, 0);
    assert_eq!(summary.objects_transformed, 0);
    assert_eq!(std::fs::read_dir(destination.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_line_stops_the_run() -> Result<()> {
    let source = TempDir::new()?;
    let destination = TempDir::new()?;
    write(source.path(), "bad.json", "{\"ok\":1}\n\"just a string\"\n")?;

    let engine = EtlEngine::new(
        LocalStore::new(source.path()),
        LocalStore::new(destination.path()),
        LogMetrics,
        PipelineSettings::default(),
    );
    let err = engine.run(ListPagesState::default()).await.unwrap_err();

    match err {
        EtlError::InvalidRecordError { key, line, .. } => {
            assert_eq!(key, "bad.json");
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!destination.path().join("bad.json").exists());
    Ok(())
}
