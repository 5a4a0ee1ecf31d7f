mod args;
mod pv;

use clap::Parser;
use env_logger::Env;
use log::debug;

fn main() {
    let args = args::Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
    debug!("args: {:?}", args);

    let options = pv::RunOptions {
        scope: args.scope.clone(),
        counting: args.counting.clone(),
        simulate: args.simulate,
        out: args.out.clone(),
    };
    let res = pv::run_election(&args.config, &options, args.reference.as_deref());
    if let Err(e) = res {
        pv::report_error(&e);
        std::process::exit(1);
    }
}
