use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    scout_mcp::main_entry().await
}
