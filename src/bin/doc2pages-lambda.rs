//! Step-function Lambda handler for edgequake-doc2pages.
//!
//! Reads the document named by the event's `pdfKey` from S3, renders it into
//! page images and writes them to the event's `resultBucket`.
//!
//! ## Deployment
//!
//! ```bash
//! cargo lambda build --release --arm64 --features lambda --bin doc2pages-lambda
//! cargo lambda deploy doc2pages-lambda --iam-role arn:aws:iam::ACCOUNT:role/doc2pages
//! ```

use aws_config::{BehaviorVersion, Region};
use edgequake_doc2pages::lambda::{LambdaConfig, StepHandler};
use lambda_runtime::{run, service_fn, Error};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // CloudWatch adds its own timestamps and does not render ANSI colours.
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_current_span(false)
        .without_time()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("edgequake_doc2pages=info".parse()?),
        )
        .init();

    let config = LambdaConfig::from_env()?;
    info!(region = %config.region, "Starting doc2pages handler");

    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;
    let client = aws_sdk_s3::Client::new(&shared_config);

    let handler = StepHandler::new(client, config);
    run(service_fn(|event| handler.handle(event))).await
}
