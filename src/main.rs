use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rrfshim::{
    init_logging, AliasConfig, LogFormat, TranslationSession, Translator, WriterExecutor,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

fn cli() -> Command {
    Command::new("rrfshim")
        .version(rrfshim::VERSION)
        .about("Translate RRF-style tool commands into tool-changer commands")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Alias configuration file (.toml or .json)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("pretty")
                .value_parser(value_parser!(LogFormat))
                .help("Log output format: pretty or json"),
        )
        .subcommand(
            Command::new("translate")
                .about("Translate a command stream")
                .arg(
                    Arg::new("input")
                        .value_parser(value_parser!(PathBuf))
                        .help("Input file, stdin when omitted"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file, stdout when omitted"),
                )
                .arg(
                    Arg::new("stats")
                        .long("stats")
                        .action(ArgAction::SetTrue)
                        .help("Print session statistics as JSON to stderr"),
                ),
        )
        .subcommand(
            Command::new("line")
                .about("Translate a single command line")
                .arg(
                    Arg::new("text")
                        .required(true)
                        .num_args(1..)
                        .help("Command line, e.g. M106 S128 T2"),
                ),
        )
        .subcommand(Command::new("list").about("Show the active alias tables"))
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let log_format = matches
        .get_one::<LogFormat>("log-format")
        .copied()
        .unwrap_or_default();
    init_logging(log_format)?;

    let config = AliasConfig::load_or_default(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("Failed to load alias configuration")?;
    let session = TranslationSession::new(config.build_translator());

    match matches.subcommand() {
        Some(("translate", sub)) => translate(session, sub),
        Some(("line", sub)) => line(session, sub),
        Some(("list", _)) => list(&session),
        _ => unreachable!("subcommand_required"),
    }
}

fn translate(mut session: TranslationSession, matches: &ArgMatches) -> anyhow::Result<()> {
    let output: Box<dyn Write> = match matches.get_one::<PathBuf>("output") {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut sink = WriterExecutor::new(output);

    let stats = match matches.get_one::<PathBuf>("input") {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            session.process_reader(BufReader::new(file), &mut sink)?
        }
        None => session.process_reader(io::stdin().lock(), &mut sink)?,
    };
    sink.flush().context("Failed to flush output")?;

    info!(
        lines = stats.lines_read,
        translated = stats.translated,
        errors = stats.errors,
        "translation finished"
    );
    if matches.get_flag("stats") {
        eprintln!("{}", serde_json::to_string(&stats)?);
    }
    Ok(())
}

fn line(mut session: TranslationSession, matches: &ArgMatches) -> anyhow::Result<()> {
    let text = matches
        .get_many::<String>("text")
        .map(|parts| parts.cloned().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let mut sink = WriterExecutor::new(io::stdout().lock());
    session.process_line(&text, &mut sink)?;
    sink.flush()?;
    Ok(())
}

fn list(session: &TranslationSession) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    write_aliases(session.translator(), &mut out)?;
    out.flush()?;
    Ok(())
}

fn write_aliases(translator: &Translator, out: &mut impl Write) -> io::Result<()> {
    for alias in translator.aliases() {
        writeln!(out, "{} -> {}", alias.name, alias.target)?;
        if !alias.description.is_empty() {
            writeln!(out, "    {}", alias.description)?;
        }
        for rule in &alias.rules {
            writeln!(out, "    {} -> {}", rule.source, rule.target)?;
        }
        for (name, value) in &alias.fixed {
            writeln!(out, "    always {}={}", name, value)?;
        }
        for chained in &alias.chained {
            writeln!(
                out,
                "    first {} when {} and any of [{}]",
                chained.target,
                chained.requires_all.join(","),
                chained.requires_any.join(",")
            )?;
        }
    }
    Ok(())
}
