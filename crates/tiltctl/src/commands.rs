//! Command handlers for tiltctl

use crate::display;
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;
use tilt_shared::config::default_config_path;
use tilt_shared::pacing::thinking_delay;
use tilt_shared::{
    CatalogStatus, PacingConfig, Reply, ReplySource, ResponseEngine, Scheduler, TiltConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Build the engine and load its datasets. A failed load leaves the engine
/// answering with placeholders rather than aborting.
pub async fn prepare_engine(config: &TiltConfig) -> ResponseEngine {
    let mut engine = ResponseEngine::new(config.engine.clone());
    match engine.load().await {
        CatalogStatus::Ready { prompts, responses } => {
            info!("Loaded {} prompts, {} responses", prompts, responses);
        }
        CatalogStatus::Unavailable { reason } => {
            display::warning(&format!("Datasets unavailable: {}", reason));
        }
        CatalogStatus::Pending => {}
    }
    engine
}

/// Reply text, with its source appended when `show_source` is set.
fn render(reply: Reply, show_source: bool) -> String {
    if !show_source {
        return reply.text;
    }
    let source = match &reply.source {
        ReplySource::Prompt(prompt) => format!("prompt: {}", prompt),
        ReplySource::Pool => "pool".to_string(),
        ReplySource::NotReady => "not ready".to_string(),
        ReplySource::NoMatch => "no match".to_string(),
    };
    format!("{}  [{}]", reply.text, source)
}

/// Show the spinner for `delay`, then print `reply` from a scheduled task.
async fn deliver(scheduler: &Scheduler, reply: String, delay: Duration) -> Result<()> {
    let spinner = display::thinking_spinner();
    let (done_tx, done_rx) = oneshot::channel();

    let shown = spinner.clone();
    let id = scheduler.schedule(
        move || {
            shown.finish_and_clear();
            display::reply(&reply);
            let _ = done_tx.send(());
        },
        delay,
    );
    debug!("Reply {} due in {:?}", id, delay);

    if done_rx.await.is_err() {
        spinner.finish_and_clear();
        bail!("Reply was dropped before it could be shown");
    }
    Ok(())
}

pub async fn chat(
    engine: &mut ResponseEngine,
    scheduler: &Scheduler,
    pacing: &PacingConfig,
    show_source: bool,
) -> Result<()> {
    display::banner(crate::VERSION, &engine.style().to_string(), engine.is_ready());

    let mut rng = StdRng::from_entropy();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        display::prompt()?;
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        let reply = render(engine.resolve(input), show_source);
        let delay = thinking_delay(&reply, pacing, &mut rng);
        deliver(scheduler, reply, delay).await?;
    }
    Ok(())
}

pub async fn ask(
    engine: &mut ResponseEngine,
    scheduler: &Scheduler,
    pacing: &PacingConfig,
    text: &[String],
    no_delay: bool,
    show_source: bool,
) -> Result<()> {
    let input = text.join(" ");
    let reply = render(engine.resolve(&input), show_source);
    if no_delay {
        display::reply(&reply);
        return Ok(());
    }
    let delay = thinking_delay(&reply, pacing, &mut StdRng::from_entropy());
    deliver(scheduler, reply, delay).await
}

/// Schedule `count` sample inputs `every_ms` apart and answer each as it
/// arrives.
pub async fn feed(
    engine: &mut ResponseEngine,
    scheduler: &Scheduler,
    pacing: &PacingConfig,
    count: usize,
    every_ms: u64,
    show_source: bool,
) -> Result<()> {
    let samples = engine.sample_inputs().to_vec();
    if samples.is_empty() {
        bail!("No sample inputs loaded; check the inputs dataset");
    }

    let mut rng = StdRng::from_entropy();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    for i in 0..count {
        let Some(input) = samples.choose(&mut rng).cloned() else {
            break;
        };
        let tx = input_tx.clone();
        let delay = Duration::from_millis(every_ms.saturating_mul(i as u64));
        scheduler.schedule(
            move || {
                let _ = tx.send(input);
            },
            delay,
        );
    }
    drop(input_tx);
    info!("Feeding {} input(s) every {}ms", count, every_ms);

    while let Some(input) = input_rx.recv().await {
        display::fed_input(&input);
        let reply = render(engine.resolve(&input), show_source);
        let delay = thinking_delay(&reply, pacing, &mut rng);
        deliver(scheduler, reply, delay).await?;
    }
    Ok(())
}

pub fn samples(engine: &ResponseEngine) -> Result<()> {
    let inputs = engine.sample_inputs();
    if inputs.is_empty() {
        display::warning("No sample inputs loaded");
        return Ok(());
    }
    for (i, input) in inputs.iter().enumerate() {
        println!("{:>3}. {}", i + 1, input);
    }
    Ok(())
}

pub fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = match path.or_else(default_config_path) {
        Some(path) => path,
        None => bail!("No config directory on this platform; pass a path"),
    };
    TiltConfig::save_default(&path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    display::success(&format!("Wrote default config to {}", path.display()));
    Ok(())
}
