// src/main.rs

use buildrig::{BuildError, cli, logging, run, status_codes};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("buildrig error: {err:?}");
            err.downcast_ref::<BuildError>()
                .map(BuildError::exit_code)
                .unwrap_or(status_codes::FAILURE)
        }
    };
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    if args.help {
        cli::print_help()?;
    }
    Ok(run(args.into()).await?)
}
