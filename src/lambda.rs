use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use lambda_sqs_etl::adapters::{EmfMetrics, LambdaDeadline, S3Store, SqsQueue};
use lambda_sqs_etl::core::invoke::invoke_json;
use lambda_sqs_etl::domain::ports::Handler;
use lambda_sqs_etl::utils::{logger, validation::Validate};
use lambda_sqs_etl::{
    HandlerKind, LambdaConfig, ListPagesHandler, SplitPageHandler, TransformHandler,
};
use serde_json::Value;

async fn invoke<H: Handler>(handler: &H, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let request_id = event.context.request_id.clone();
    let budget = LambdaDeadline::new(event.context.deadline);

    invoke_json(handler, event.payload, &budget)
        .await
        .map_err(|e| {
            tracing::error!(
                request_id = %request_id,
                handler = H::NAME,
                category = ?e.category(),
                "{}",
                e
            );
            Error::from(e)
        })
}

async fn serve<H: Handler>(handler: H) -> Result<(), Error> {
    let handler = &handler;
    tracing::info!(handler = H::NAME, "Lambda runtime ready");
    run(service_fn(move |event: LambdaEvent<Value>| async move {
        invoke(handler, event).await
    }))
    .await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = LambdaConfig::from_env()?;
    config.validate()?;
    let kind = HandlerKind::from_env()?;

    // 客戶端在冷啟動時建立一次，之後的呼叫共用
    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3 = aws_sdk_s3::Client::new(&aws);
    let sqs = aws_sdk_sqs::Client::new(&aws);

    match kind {
        HandlerKind::ListPages => {
            let handler = ListPagesHandler::new(
                S3Store::new(s3, config.source_bucket()?),
                SqsQueue::new(sqs, config.pages_queue_url()?),
                config.clone(),
            );
            serve(handler).await
        }
        HandlerKind::SplitPage => {
            let handler =
                SplitPageHandler::new(SqsQueue::new(sqs, config.objects_queue_url()?), config.clone());
            serve(handler).await
        }
        HandlerKind::Transform => {
            let handler = TransformHandler::new(
                S3Store::new(s3.clone(), config.source_bucket()?),
                S3Store::new(s3, config.destination_bucket()?),
                EmfMetrics,
                config.clone(),
            );
            serve(handler).await
        }
    }
}
