use std::rc::Rc;

use atty::Stream;
use clap::Parser;
use color_eyre::Result;

use bk_core::{Config, UserIo};

mod cli;
mod console;
mod dispatch;
mod style;

use cli::BkCli;
use console::ConsoleIo;
use dispatch::{dispatch, CommandContext};
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = BkCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let style = Style::new(cli.no_color, atty::is(Stream::Stderr));
    let io: Rc<dyn UserIo> = Rc::new(ConsoleIo::new(style));

    let outcome = Config::from_env()
        .and_then(|config| CommandContext::new(config, Rc::clone(&io), style))
        .and_then(|ctx| dispatch(&ctx, &cli.command));

    if let Err(err) = outcome {
        tracing::debug!(error = ?err, "command failed");
        eprintln!("{}", style.error(&format!("{err:#}")));
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("bk={level},bk_cli={level},bk_core={level},bk_store={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
