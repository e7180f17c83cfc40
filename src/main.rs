use blkbench::cli::{self, Args};
use blkbench::{error, APP_NAME};
use clap::Parser;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    match cli::run(&args).await {
        Ok(output) => println!("{}", output.trim_end()),
        Err(e) => {
            eprintln!("{}: {}", APP_NAME, error::user_friendly_message(&e));
            std::process::exit(error::exit_code(&e));
        }
    }
}
