use buildfeed::config::{start_time, version, Config};
use buildfeed::state::AppState;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_logging();

    // pin the start time before the first request asks for it
    start_time();

    let config = Config::from_env()?;
    tracing::info!(version = version(), "starting buildfeed");

    let state = AppState::live(config);
    let _rocket = buildfeed::app(state)?.launch().await?;
    Ok(())
}
