mod args;
mod rcv;

use clap::Parser;
use log::{debug, LevelFilter};
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();
    debug!("args: {:?}", args);

    let res = rcv::run_command(
        args.config.clone(),
        args.input.clone(),
        args.input_type.clone(),
        args.excel_worksheet_name.clone(),
        args.reference.clone(),
        args.out.clone(),
    );

    if let Err(e) = res {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
