mod cli;
mod render;

use clap::Parser;
use freqshow_engine::{Engine, SpectrumModel};
use freqshow_messages::Command;

use log::{LevelFilter, info};
use std::io::Write;

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .format(|buf, record| {
            writeln!(
                buf,
                "{:<5} - mod path |{}| - args: |{}|",
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .filter_module("freqshow_engine", LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let source = cli.source();
    let model = SpectrumModel::open(&source, cli.model_config()?)?;
    info!("Opened {source:?}");

    // Ctrl-C interrupts a blocked acquisition as well as the loop
    let cancel = model.cancel_token();
    ctrlc::set_handler(move || cancel.cancel())?;

    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (event_tx, event_rx) = flume::bounded(1);

    let engine_handle = std::thread::spawn(move || Engine::new(cmd_rx, event_tx, model).run());

    // Draw on the main thread (blocking)
    let rendered = render::run(&event_rx, cli.columns, cli.frames);

    // Renderer has exited - stop the engine and release a blocked send
    let _ = cmd_tx.send(Command::Stop);
    drop(event_rx);

    engine_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Engine thread panicked"))??;

    rendered
}
