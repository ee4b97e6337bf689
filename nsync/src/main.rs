#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nsync::run_cli().await
}
