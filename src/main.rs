use accordion::{parse_args, run, CliError};
use simplelog::*;
use std::env;
use std::process;

fn main() {
    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::Usage(message)) => {
            eprintln!("{}", message);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(level, ConfigBuilder::default().build(), TerminalMode::Stderr, ColorChoice::Auto)
        .unwrap_or_else(|err| eprintln!("init_logger error: {err:?}"));

    match run(&options) {
        Ok(output) => println!("{}", output.trim_end()),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
