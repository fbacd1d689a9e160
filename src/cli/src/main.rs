#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;
extern crate clap;
extern crate rustyline;

use clap::{App, Arg};
use env_logger::Env;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use std::fs;
use std::process;

mod config;
mod session;

use crate::config::ArborConfig;
use crate::session::Session;

fn print_outcome(outcome: Result<String, common::ArborError>) {
    match outcome {
        Ok(out) => print!("{}", out),
        Err(e) => eprintln!("{}", e),
    }
}

fn process_cli_input(session: &mut Session) {
    let mut rl = Editor::<()>::new();
    if rl.load_history("history.txt").is_err() {
        info!("No previous history.");
    }
    let prompt: &str = "[arbor]>> ";
    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str());
                match session.handle_line(&line) {
                    Some(outcome) => print_outcome(outcome),
                    None => break,
                }
            }
            Err(ReadlineError::Interrupted) => {
                info!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                info!("CTRL-D");
                break;
            }
            Err(err) => {
                error!("Error: {:?}", err);
                break;
            }
        }
    }
    if let Err(e) = rl.save_history("history.txt") {
        warn!("Could not save history: {}", e);
    }
}

/// Runs the semicolon delimited statements and commands of a script.
fn process_script_input(session: &mut Session, script: &str) {
    for line in script.split(';') {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        let clean_command = command.replace("\n", " ");
        info!("Script clean command: {}", clean_command);
        match session.handle_line(&clean_command) {
            Some(outcome) => print_outcome(outcome),
            None => break,
        }
    }
}

fn main() {
    // Configure log environment
    env_logger::from_env(Env::default().default_filter_or("info")).init();

    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Workspace configuration: tables, views and nodes")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("query")
                .short("q")
                .long("query")
                .value_name("SQL")
                .help("Runs one query and exits")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("explain")
                .short("e")
                .long("explain")
                .help("With --query, prints the optimized plan instead of running it"),
        )
        .arg(
            Arg::with_name("json-plan")
                .short("j")
                .long("json-plan")
                .help("With --query, prints the optimized plan as JSON")
                .conflicts_with("explain"),
        )
        .arg(
            Arg::with_name("script")
                .short("s")
                .long("script")
                .value_name("ARBOR_SCRIPT")
                .help("Takes in a semicolon delimited file of commands and SQL queries.")
                .takes_value(true)
                .required(false),
        )
        .get_matches();

    let config = match matches.value_of("config") {
        Some(path) => match ArborConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to read {}: {}", path, e);
                process::exit(1);
            }
        },
        None => ArborConfig::default(),
    };
    info!("Starting arbor with workspace '{}'", config.workspace);

    let mut session = match Session::from_config(&config) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to load workspace: {}", e);
            process::exit(1);
        }
    };

    if let Some(sql) = matches.value_of("query") {
        let outcome = if matches.is_present("json-plan") {
            session.plan_json(sql)
        } else {
            session.run_sql(sql, matches.is_present("explain"))
        };
        let failed = outcome.is_err();
        print_outcome(outcome);
        if failed {
            process::exit(1);
        }
    } else if let Some(path) = matches.value_of("script") {
        match fs::read_to_string(path) {
            Ok(script) => process_script_input(&mut session, &script),
            Err(e) => {
                error!("Failed to read {}: {}", path, e);
                process::exit(1);
            }
        }
    } else {
        process_cli_input(&mut session);
    }
    info!("Terminated.");
}
