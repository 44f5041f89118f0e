mod config;
mod outcome;
mod report;
mod runner;
mod tally;
#[cfg(test)]
mod testing;

use std::sync::{ Arc, atomic::{ AtomicBool, Ordering } };
use anyhow::Context;
use clap::Parser;
use config::Config;
use report::AUTOSCALING_HINT;
use runner::Runner;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    // a bad URL aborts here, before any request is sent
    let runner = Runner::new(config)?;

    let cancel = Arc::new(Notify::new());
    install_interrupt_handler(Arc::clone(&cancel))?;

    let stats = runner.run(cancel)?;
    print!("{}", stats);
    println!("\n{}", AUTOSCALING_HINT);

    Ok(())
}

/// First Ctrl+C stops the run gracefully, a second one force-quits.
fn install_interrupt_handler(cancel: Arc<Notify>) -> anyhow::Result<()> {
    let interrupted = AtomicBool::new(false);
    ctrlc
        ::set_handler(move || {
            if interrupted.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce quit");
                std::process::exit(130);
            }
            eprintln!("\nStopping... (press Ctrl+C again to force quit)");
            cancel.notify_one();
        })
        .context("failed to install Ctrl+C handler")
}
