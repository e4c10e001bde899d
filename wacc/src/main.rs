use log::LevelFilter;
use std::process::ExitCode;
use wacc::args::Args;

const USAGE: &str = "Usage: wacc [--lex | --parse | --validate] [-o <output>] [-v] <file>";

fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        eprintln!("{USAGE}");
        return ExitCode::from(1);
    };

    let level = if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match wacc::compile(&args.file, &args.config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            if e.is_syntax() {
                eprintln!("1 parser error(s) detected, no further compilation attempted.");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
