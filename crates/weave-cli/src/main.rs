//! Command-line driver: no arguments starts the REPL; one argument runs it
//! as a script file; `-e`/`--eval` runs an inline string. Exit codes:
//! `0` success, `1` unhandled runtime error, `2` parse error.

use std::{
    env, fs,
    io::{self, Write},
    process::ExitCode,
};

use weave::{tracer::StderrTracer, Error, LineStatus, ReplSession, Runner};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let trace = env::var_os("WEAVE_TRACE").is_some() || take_flag(&mut args, "--trace");

    match args.first().map(String::as_str) {
        None => run_repl(trace),
        Some("--version" | "-v") => {
            println!("weave {VERSION}");
            ExitCode::SUCCESS
        }
        Some("--help" | "-h") => {
            print_usage();
            ExitCode::SUCCESS
        }
        Some("-e" | "--eval") => match args.get(1) {
            Some(source) => run_source(source, trace),
            None => {
                eprintln!("error: {} expects an argument", args[0]);
                print_usage();
                ExitCode::from(2)
            }
        },
        Some(path) => run_file(path, trace),
    }
}

/// Removes the first occurrence of `flag` from `args` in place, returning
/// whether it was present.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    }
}

fn print_usage() {
    println!("usage: weave [<script>] [-e <source>] [--trace] [--version] [--help]");
}

fn run_file(path: &str, trace: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: could not read {path}: {err}");
            return ExitCode::from(1);
        }
    };
    run_source(&source, trace)
}

fn run_source(source: &str, trace: bool) -> ExitCode {
    let runner = Runner::new().with_trace(trace);
    match runner.run_str(source) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err @ Error::ParseError { .. }) => {
            eprintln!("{}", err.report());
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("{}", err.report());
            ExitCode::from(1)
        }
    }
}

fn run_repl(trace: bool) -> ExitCode {
    println!("weave {VERSION} — interactive mode (Ctrl-D to exit)");
    let mut session = ReplSession::new();
    if trace {
        session.set_tracer(Box::new(StderrTracer::new()));
    }
    let stdin = io::stdin();
    loop {
        print_prompt(session.is_mid_statement());
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = line.trim_end_matches('\n');
        match session.feed_line(trimmed) {
            Ok(LineStatus::Continuation) => continue,
            Ok(LineStatus::Complete) => match session.execute() {
                Ok(value) => println!("{value}"),
                Err(err) => eprintln!("{}", err.report()),
            },
            Err(err) => eprintln!("{}", err.report()),
        }
    }
    println!();
    ExitCode::SUCCESS
}

fn print_prompt(continuation: bool) {
    print!("{}", if continuation { "... " } else { ">> " });
    let _ = io::stdout().flush();
}
