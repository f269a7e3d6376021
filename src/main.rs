use env_logger::Env;
use hr_dashboard::app;
use hr_dashboard::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    app::run(config).await?;

    Ok(())
}
