//! Basic usage example - resolve a few element descriptions against a CDP browser
//!
//! Needs a browser started with `--remote-debugging-port=9222`, the engine
//! binary (set `LOCATR_BINARY_PATH` or pass it as the first argument) and an
//! `LLM_API_KEY` in the environment.

use locatr_client::{
    BackendSettings, EngineOptions, LlmProvider, LlmSettings, Locatr, LocatrSettings, LogLevel,
    Result,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .compact()
        .init();

    let api_key = std::env::var("LLM_API_KEY").unwrap_or_default();
    let settings = LocatrSettings::new(
        BackendSettings::cdp("http://localhost:9222")?,
        LlmSettings::new(LlmProvider::OpenAi, api_key, "gpt-4o"),
    )
    .with_cache_path(".locatr.cache");

    let mut engine = EngineOptions::default().with_log_level(Some(LogLevel::Info));
    if let Some(binary) = std::env::args().nth(1) {
        engine = engine.with_binary_path(binary);
    }

    let locatr = Locatr::builder(settings)
        .with_engine_options(engine)
        .build();

    println!("Resolving \"search bar\"...");
    let output = locatr.get("search bar", None)?;
    println!("{} -> {:?}", output.selector_type, output.selectors);

    println!("Resolving \"sign in button\" on a worker thread...");
    let output = locatr.get_async("sign in button", None).await?;
    match output.first() {
        Some(selector) => println!("best match: {}", selector),
        None => println!("no element matched"),
    }

    Ok(())
}
