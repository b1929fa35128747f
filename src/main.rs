use clap::Parser;
use shardvault::cli::{commands, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Set up tracing based on verbosity; RUST_LOG wins when set.
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Keygen { ref path } => commands::keygen::execute(path.as_deref()),
        Commands::Init => commands::init::execute(&cli).await,
        Commands::Get { ref key } => commands::get::execute(&cli, key).await,
        Commands::Set {
            ref key,
            ref value,
            ref encoding,
        } => commands::set::execute(&cli, key, value.as_deref(), encoding.as_deref()).await,
        Commands::Delete { ref key, force } => commands::delete::execute(&cli, key, force).await,
        Commands::Keys { ref prefix } => commands::keys::execute(&cli, prefix.as_deref()).await,
        Commands::List => commands::list::execute(&cli).await,
    };

    if let Err(e) = result {
        shardvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
