use anyhow::Context;
use clap::Parser;
use lambda_sqs_etl::adapters::metrics::LogMetrics;
use lambda_sqs_etl::utils::error::ErrorSeverity;
use lambda_sqs_etl::utils::{logger, validation::Validate};
use lambda_sqs_etl::{CliConfig, EtlEngine, ListPagesState, LocalStore};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting lambda-sqs-etl local run");
    tracing::debug!("CLI config: {:?}", cli);

    let run = match cli.resolve().and_then(|run| run.validate().map(|_| run)) {
        Ok(run) => run,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(&run.destination_dir).with_context(|| {
        format!(
            "creating destination directory {}",
            run.destination_dir.display()
        )
    })?;

    let engine = EtlEngine::new(
        LocalStore::new(&run.source_dir),
        LocalStore::new(&run.destination_dir),
        LogMetrics,
        run.settings.clone(),
    )
    .with_invocation_budget(Duration::from_millis(run.invocation_budget_ms))
    .with_max_list_invocations(run.max_list_invocations)
    .with_monitoring(run.monitor);

    match engine.run(ListPagesState::default()).await {
        Ok(summary) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!(
                "📁 {} objects ({} lines) written to {}",
                summary.objects_transformed,
                summary.lines_processed,
                run.destination_dir.display()
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("serializing run summary")?
            );
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
