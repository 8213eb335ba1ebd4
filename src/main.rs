#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examly_rust::run().await {
        eprintln!("examly-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
