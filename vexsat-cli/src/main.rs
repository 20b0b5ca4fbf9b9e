use std::fs;
use std::io::{self, Read, Write};
use std::process;
use std::time::Duration;

use anyhow::Error;
use clap::{App, AppSettings, Arg, ArgMatches, ErrorKind};
use env_logger::{fmt, Builder, Target};
use log::{error, info, Level, LevelFilter, Record};

use vexsat::config::{SolverConfig, ValueHeuristic};
use vexsat::solver::{SolveResult, Solver};
use vexsat_dimacs::DimacsParser;

/// How the input formula is handed to the solver.
#[derive(Copy, Clone, Eq, PartialEq)]
enum Mode {
    /// Load the whole formula at once, then solve.
    Normal,
    /// Feed the formula clause by clause through the incremental interface.
    Incremental,
}

/// Word-long flags taking the option table's single-dash spelling (`-timeout 10`).
const WORD_FLAGS: &[&str] = &["timeout", "valdh", "mode"];

/// Accept the single-dash spelling of the word-long flags.
///
/// The option table convention strips exactly one leading dash, so `-timeout` and `--timeout`
/// both name the same option. clap only parses the double-dash form, so the single-dash spelling
/// is rewritten before parsing.
fn normalize_args() -> Vec<String> {
    std::env::args()
        .enumerate()
        .map(|(position, arg)| {
            let single_dash = position > 0 && arg.starts_with('-') && !arg.starts_with("--");
            let word_flag = single_dash
                && WORD_FLAGS
                    .iter()
                    .any(|&flag| &arg[1..] == flag || arg[1..].starts_with(&format!("{}=", flag)));
            if word_flag {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

fn app() -> App<'static, 'static> {
    App::new("vexsat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("An incremental CDCL based SAT solver")
        .setting(AppSettings::DisableHelpSubcommand)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .value_name("LEVEL")
                .possible_values(&["0", "1", "2"])
                .default_value("0")
                .help("Verbosity level"),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .help("Timeout in seconds"),
        )
        .arg(
            Arg::with_name("valdh")
                .long("valdh")
                .value_name("HEURISTIC")
                .possible_values(&["0", "1"])
                .default_value("0")
                .help("Value decision heuristic {0: phase-saving, 1: literal-score}"),
        )
        .arg(
            Arg::with_name("mode")
                .long("mode")
                .value_name("MODE")
                .possible_values(&["0", "1"])
                .default_value("0")
                .help("Input mode {0: normal, 1: incremental}"),
        )
        .arg(Arg::with_name("INPUT").help("The input file to use (stdin if omitted)"))
}

fn init_logging(level: LevelFilter) {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder.target(Target::Stdout).format(format).filter(None, level);

    if let Ok(ref env_var) = std::env::var("VEXSAT_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn main() {
    let matches = match app().get_matches_from_safe(normalize_args()) {
        Ok(matches) => matches,
        Err(err) => match err.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => {
                print!("{}", err.message);
                process::exit(0);
            }
            _ => {
                eprintln!("{}", err.message);
                process::exit(2);
            }
        },
    };

    let (config, mode, level) = match parse_options(&matches) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(2);
        }
    };

    init_logging(level);

    let exit_code = match run(&matches, config, mode) {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{}", err);
            1
        }
    };
    process::exit(exit_code);
}

fn parse_options(matches: &ArgMatches) -> Result<(SolverConfig, Mode, LevelFilter), String> {
    let level = match matches.value_of("verbose").unwrap() {
        "0" => LevelFilter::Warn,
        "1" => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let mut config = SolverConfig::default();

    if let Some(timeout) = matches.value_of("timeout") {
        let seconds: f64 = timeout
            .parse()
            .map_err(|_| format!("timeout value {} not numeric", timeout))?;
        if !(0.0..=36000.0).contains(&seconds) {
            return Err(format!("timeout value {} not in range", timeout));
        }
        if seconds > 0.0 {
            config.timeout = Some(Duration::from_secs_f64(seconds));
        }
    }

    if matches.value_of("valdh").unwrap() == "1" {
        config.value_heuristic = ValueHeuristic::LitScore;
    }

    let mode = match matches.value_of("mode").unwrap() {
        "0" => Mode::Normal,
        _ => Mode::Incremental,
    };

    Ok((config, mode, level))
}

fn run(matches: &ArgMatches, config: SolverConfig, mode: Mode) -> Result<i32, Error> {
    info!("This is vexsat {}", env!("CARGO_PKG_VERSION"));

    let mut solver = Solver::new();
    solver.set_config(config);

    let stdin = io::stdin();

    let mut locked_stdin;
    let mut opened_file;

    let file: &mut dyn Read = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            opened_file = fs::File::open(path)?;
            &mut opened_file
        }
        None => {
            info!("Reading from stdin");
            locked_stdin = stdin.lock();
            &mut locked_stdin
        }
    };

    match mode {
        Mode::Normal => solver.add_dimacs_cnf(file)?,
        Mode::Incremental => {
            // Route every clause through the staged clause interface, exercising the same path
            // an incremental user of the library takes.
            let formula = DimacsParser::parse(file)?;
            for clause in formula.iter() {
                if clause.is_empty() {
                    solver.add_formula(&vexsat::CnfFormula::from(Some(clause)));
                    continue;
                }
                for lit in clause {
                    solver.add(lit.to_dimacs())?;
                }
                solver.add(0)?;
            }
        }
    }

    let result = solver.solve();

    let stats = solver.stats();
    info!("Restarts: {}", stats.restarts);
    info!("Learned clauses: {}", stats.conflicts);
    info!("Decisions: {}", stats.decisions);
    info!("Implications: {}", stats.implications());

    match result {
        SolveResult::Sat => {
            println!("s SATISFIABLE");
            print!("v");
            for lit in solver.model().unwrap() {
                print!(" {}", lit);
            }
            println!(" 0");
        }
        SolveResult::Unsat => println!("s UNSATISFIABLE"),
        SolveResult::Timeout => println!("s UNKNOWN"),
    }

    Ok(result.code())
}
