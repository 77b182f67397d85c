use anyhow::Result;
use clap::Parser;
use cli_chat::{ChatArgs, ChatCli, Settings};
use tracing::info;
use tracing_chrome::ChromeLayerBuilder;
use tracing_log::AsTrace;
use tracing_subscriber::prelude::*;

fn main() -> Result<()> {
    let start = std::time::Instant::now();

    let chat_args = ChatArgs::parse();

    let settings = Settings::new()?;
    // -v/-q adjust the level, the default comes from settings
    let log_level_filter = chat_args.verbose.log_level_filter().as_trace();

    // stdout belongs to the chat, so logs go to stderr
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(log_level_filter);
    let (chrome_layer, _guard) = if chat_args.tracing {
        let (chrome_layer, guard) = ChromeLayerBuilder::new().build();
        (Some(chrome_layer), Some(guard))
    } else {
        (None, None)
    };
    tracing_subscriber::registry()
        .with(chrome_layer)
        .with(fmt_layer)
        .init();
    info!("Initialized args, settings, and logging in {:?}", start.elapsed());

    let chat_cli = ChatCli::new(settings, chat_args, Some(start));

    chat_cli.exec()?;

    Ok(())
}
