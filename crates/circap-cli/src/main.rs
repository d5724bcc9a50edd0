use circap_cli::{Cli, Commands};
use clap::Parser;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match &cli.command {
        Commands::Run(args) => commands::run::handle(args),
        Commands::Validate { input, scenario } => {
            commands::validate::handle(input, scenario.as_deref())
        }
        Commands::Windows {
            start,
            end,
            window,
            mode,
            scheme,
        } => commands::windows::handle(*start, *end, *window, mode, scheme),
    };

    if let Err(err) = result {
        error!("{:#}", err);
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
