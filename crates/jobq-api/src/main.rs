#[tokio::main]
async fn main() {
    if let Err(err) = jobq_api::run().await {
        tracing::error!(error = %err, "jobq-api failed");
        std::process::exit(1);
    }
}
