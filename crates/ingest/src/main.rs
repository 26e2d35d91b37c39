use ingest::runtime::{boot, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (config, parser) = boot::boot(std::env::args().skip(1))?;
    run::run(config, parser).await
}
