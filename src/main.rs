// src/main.rs

use dobi::errors::DobiError;
use dobi::tasks::signals;
use dobi::{cli, logging, run};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.requested_log_level()) {
        eprintln!("dobi: {err:#}");
        std::process::exit(1);
    }

    let code = match run(args).await {
        Ok(()) => 0,
        Err(err) => {
            report(&err);
            err.exit_code()
        }
    };
    std::process::exit(if signals::interrupted() { 130 } else { code });
}

fn report(err: &DobiError) {
    match err {
        DobiError::Config { .. } => eprintln!("{err}"),
        other => error!("{other}"),
    }
}
