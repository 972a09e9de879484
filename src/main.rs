use std::env;
use std::process;

mod builtins;
mod command;
mod config;
mod editor;
mod error;
mod executor;
mod history;
mod jobs;
mod logger;
mod parser;
mod prompt;
mod redirects;
mod report;
mod shell;

use config::Config;
use executor::ExitStatus;

fn print_help() {
    println!("seashell - an interactive shell");
    println!();
    println!("Usage: seashell [OPTIONS]");
    println!("  -c <line>        Run one command line and exit");
    println!("  -h, --help       Print this help");
    println!("  -v, --version    Print version");
    println!();
    println!("Set {}=debug to log to stderr.", config::LOG_ENV);
}

fn print_version() {
    println!("seashell v {}", env!("CARGO_PKG_VERSION"));
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        process::exit(0);
    }

    if args.iter().any(|a| a == "-v" || a == "--version" || a == "-V") {
        print_version();
        process::exit(0);
    }

    let config = Config::from_env();
    logger::init(config.log_level);
    log::debug!("search path: {:?}", config.search_path);

    let mut shell = shell::Shell::new(config);

    if let Some(pos) = args.iter().position(|a| a == "-c") {
        let Some(line) = args.get(pos + 1) else {
            eprintln!("seashell: -c: option requires an argument");
            process::exit(ExitStatus::CommandNotFound.code());
        };
        let code = match shell.eval(line) {
            ExitStatus::RequestExit => 0,
            status => status.code(),
        };
        process::exit(code);
    }

    shell.run();
}
