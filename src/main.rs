mod args;
mod comvote;

use clap::Parser;
use log::{debug, info};
use snafu::ErrorCompat;

fn main() {
    let args = args::Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!("args: {:?}", args);

    let res = comvote::InputType::parse(args.input_type.as_deref()).and_then(|input_type| {
        comvote::run_election(
            &args.input,
            input_type,
            args.out.as_deref(),
            args.reference.as_deref(),
        )
    });

    match res {
        Ok(()) => info!("Election evaluated"),
        Err(e) => {
            eprintln!("An error occured {}", e);
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
