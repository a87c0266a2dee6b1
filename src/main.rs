use tabletop_host::run_with_config;

#[tokio::main]
async fn main() {
    if let Err(err) = run_with_config().await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}
