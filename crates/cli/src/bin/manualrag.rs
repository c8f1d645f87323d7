use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    manualrag_cli::main_entry().await
}
