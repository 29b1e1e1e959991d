//! EdgeBounce demo: a bouncing switch on a simulated line.
//!
//! ```text
//! ┌──────────────────┐ on_edge_now ┌───────────────────────────┐
//! │ switch thread    │────────────▶│ Pipeline                  │
//! │ (bursts of       │             │  timer · worker · counters│──▶ LogEventHandler
//! │  bounces)        │             └───────────────────────────┘
//! └──────────────────┘
//! ```
//!
//! Usage: `edgebounce [config.json]`. The optional file holds a JSON
//! `PipelineConfig`; missing fields take their defaults. The final
//! snapshot is printed as JSON on stdout.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::info;

use edgebounce::{LogEventHandler, Pipeline, PipelineConfig, SimLine};

/// Presses simulated on the switch.
const PRESSES: u32 = 5;
/// Contact bounces per press (odd, so every press flips the level).
const BOUNCES_PER_PRESS: u32 = 5;
/// Gap between two bounces of one press.
const BOUNCE_GAP: Duration = Duration::from_millis(2);

fn load_config() -> Result<PipelineConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            PipelineConfig::from_json(&text).map_err(|e| anyhow!("{path}: {e}"))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("EdgeBounce v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let window = Duration::from_millis(u64::from(config.window_ms));

    let line = SimLine::new(false);
    let pipeline = Pipeline::new(config, line.clone(), LogEventHandler::new())?;
    let injector = pipeline.injector();

    let switch = thread::Builder::new()
        .name("switch".into())
        .spawn(move || {
            for press in 0..PRESSES {
                for _ in 0..BOUNCES_PER_PRESS {
                    line.toggle();
                    injector.on_edge_now();
                    thread::sleep(BOUNCE_GAP);
                }
                info!("switch: press {} done, level={}", press + 1, line.level());
                thread::sleep(window * 3);
            }
        })
        .context("spawning switch thread")?;

    switch
        .join()
        .map_err(|_| anyhow!("switch thread panicked"))?;

    // Let the last window close and its event settle.
    thread::sleep(window * 2);
    pipeline.shutdown();

    let snapshot = pipeline.snapshot();
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| anyhow!("encoding snapshot: {e}"))?;
    println!("{json}");

    Ok(())
}
