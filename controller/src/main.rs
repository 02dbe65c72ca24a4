mod honeywell;
mod host;
mod pipeline;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
