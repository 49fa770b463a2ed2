use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

mod actions;
mod config;
mod editor;
mod executor;
mod files;
mod framing;
mod logging;
mod reconcile;
mod validate;
use actions::FileAction;
use config::Settings;
use editor::{EditSession, ExternalEditor};
use executor::{ActionOutcome, ExecuteOptions, ExecutionReport};
use files::ListOptions;
use framing::Framing;
use logging::{ChangeLog, ChangeLogEntry};
use reconcile::Mode;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn should_color(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModeChoice {
    #[default]
    Line,
    Diff,
}

impl From<ModeChoice> for Mode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Line => Mode::Line,
            ModeChoice::Diff => Mode::Diff,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Log(cmd)) => handle_log(cmd)?,
        None => handle_rename(cli.rename)?,
    }

    Ok(())
}

fn handle_rename(args: RenameArgs) -> Result<()> {
    let settings = config::load_settings(args.config.as_deref())?;
    let options = RunOptions::merge(&args, &settings);
    let colorize = options.color.should_color();

    let files = files::list_files(&args.paths, &options.list)?;
    if files.is_empty() {
        println!("no files to rename.");
        return Ok(());
    }

    let framing = Framing::new(options.header, options.mode);
    let editor = ExternalEditor::resolve(options.editor.as_deref())?;
    if options.verbose {
        print_run_summary(&options, &editor, &framing, files.len());
    }

    let actions = collect_actions(&files, &framing, &editor, options.mode)?;
    if actions.is_empty() {
        println!("no changes.");
        return Ok(());
    }

    let conflicts = validate::validate(&actions, |path| fs::symlink_metadata(path).is_ok());
    for conflict in &conflicts {
        println!("conflict: {conflict}");
    }
    if !conflicts.is_empty() && !options.dry_run {
        bail!(
            "{} conflict(s) found; nothing was changed (rerun with --dry-run to preview)",
            conflicts.len()
        );
    }

    if !options.dry_run && !options.auto_apply {
        for action in &actions {
            println!("{}", paint(action, colorize));
        }
        if !confirm(actions.len())? {
            println!("aborted; nothing was changed.");
            return Ok(());
        }
    }

    let report = executor::execute(
        &actions,
        ExecuteOptions {
            dry_run: options.dry_run,
            verbose: options.verbose,
        },
    );
    emit_json_events(&options, &report);
    if !options.dry_run && !options.no_log {
        record_history(&report);
    }
    report.print();

    if report.has_failures() {
        bail!("{} action(s) failed", report.count("failed"));
    }
    if options.dry_run {
        println!("dry-run: rerun without --dry-run to apply these changes.");
    }
    Ok(())
}

fn collect_actions(
    files: &[String],
    framing: &Framing,
    session: &dyn EditSession,
    mode: Mode,
) -> Result<Vec<FileAction>> {
    let text = framing.frame(files);
    let Some(edited) = session.edit(&text)? else {
        return Ok(Vec::new());
    };

    // diff mode has no line-count check to catch a shifted header
    if mode == Mode::Diff && !framing.header_intact(&edited) {
        bail!("the header block was modified; nothing was changed");
    }

    let edited = framing.unframe(&edited);
    Ok(mode.reconcile(files, &edited)?)
}

fn record_history(report: &ExecutionReport) {
    let entries: Vec<_> = report
        .outcomes
        .iter()
        .map(|(action, outcome)| ChangeLogEntry::new(action, outcome))
        .collect();
    let log = ChangeLog::default();
    if let Err(err) = log.record(&entries) {
        println!(
            "warning: could not update change log {}: {err:#}",
            log.path().display()
        );
    }
}

fn emit_json_events(options: &RunOptions, report: &ExecutionReport) {
    if !options.json {
        return;
    }
    for (action, outcome) in &report.outcomes {
        let mut event = match serde_json::to_value(action) {
            Ok(JsonValue::Object(map)) => map,
            _ => JsonMap::new(),
        };
        event.insert("status".into(), JsonValue::String(outcome.label().to_string()));
        event.insert("dry_run".into(), JsonValue::Bool(options.dry_run));
        if let ActionOutcome::Failed(message) = outcome {
            event.insert("error".into(), JsonValue::String(message.clone()));
        }
        println!("{}", JsonValue::Object(event));
    }
}

fn paint(action: &FileAction, colorize: bool) -> String {
    if !colorize {
        return action.to_string();
    }
    let color = match action {
        FileAction::Rename { .. } => "33",
        FileAction::Delete { .. } => "31",
    };
    format!("\x1b[{color}m{action}\x1b[0m")
}

fn print_run_summary(
    options: &RunOptions,
    editor: &ExternalEditor,
    framing: &Framing,
    file_count: usize,
) {
    println!(
        "mode: {}{}",
        match options.mode {
            Mode::Line => "line",
            Mode::Diff => "diff",
        },
        if options.dry_run { " (dry-run)" } else { "" }
    );
    println!("editor: {}", editor.describe());
    println!("header lines: {}", framing.header_len());
    println!("recursive: {}", options.list.recursive);
    println!("include dirs: {}", options.list.include_dirs);
    println!("include hidden: {}", options.list.include_hidden);
    if !options.list.exclude.is_empty() {
        println!("exclude globs: {:?}", options.list.exclude);
    }
    println!("listed files: {file_count}");
    println!("---");
}

fn confirm(count: usize) -> Result<bool> {
    if !io::stdin().is_terminal() {
        bail!("refusing to apply {count} change(s) without confirmation; pass --yes");
    }
    loop {
        print_prompt(&format!("Apply {count} change(s)? [y]es/[n]o: "))?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "" => return Ok(false),
            _ => {
                println!("Please enter y or n.");
            }
        }
    }
}

fn print_prompt(message: &str) -> Result<()> {
    print!("{message}");
    io::stdout().flush()?;
    Ok(())
}

fn handle_log(cmd: LogCommand) -> Result<()> {
    let entries = ChangeLog::default().read_recent(cmd.tail)?;
    if entries.is_empty() {
        println!("change log is empty.");
        return Ok(());
    }
    for entry in entries {
        if cmd.json {
            println!("{}", serde_json::to_string(&entry)?);
            continue;
        }
        let target = match &entry.destination {
            Some(destination) => format!("'{}' -> '{destination}'", entry.source),
            None => format!("'{}'", entry.source),
        };
        println!(
            "[{}] {:<7} {:<8} {target}",
            entry.timestamp, entry.action, entry.status
        );
        if let Some(error) = &entry.error {
            println!("    error: {error}");
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct RunOptions {
    list: ListOptions,
    mode: Mode,
    header: bool,
    editor: Option<String>,
    dry_run: bool,
    verbose: bool,
    auto_apply: bool,
    json: bool,
    no_log: bool,
    color: ColorChoice,
}

impl RunOptions {
    fn merge(args: &RenameArgs, settings: &Settings) -> Self {
        let mut exclude = settings.exclude.clone().unwrap_or_default();
        exclude.extend(args.exclude.iter().cloned());
        let mode = if args.diff {
            ModeChoice::Diff
        } else {
            settings.mode.unwrap_or_default()
        };
        Self {
            list: ListOptions {
                recursive: args.recursive,
                include_dirs: args.include_dirs,
                include_hidden: args.include_hidden || settings.include_hidden.unwrap_or(false),
                exclude,
            },
            mode: mode.into(),
            header: args.header || settings.header.unwrap_or(false),
            editor: args.editor.clone().or_else(|| settings.editor.clone()),
            dry_run: args.dry_run,
            verbose: args.verbose,
            auto_apply: args.auto_apply,
            json: args.json,
            no_log: args.no_log,
            color: args.color.or(settings.color).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "massren",
    version,
    about = "Rename and delete files by editing their names in a text editor",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[command(flatten)]
    rename: RenameArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show recently applied changes
    Log(LogCommand),
}

#[derive(Debug, Clone, Args)]
struct RenameArgs {
    /// Files, directories or glob patterns (default: current directory)
    #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath)]
    paths: Vec<String>,
    /// Print the actions without touching any file
    #[arg(short = 'n', long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,
    /// Print each action as it is performed
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
    /// List directories recursively
    #[arg(short, long, action = ArgAction::SetTrue)]
    recursive: bool,
    /// List directories themselves, not only files
    #[arg(short = 'd', long = "include-dirs", action = ArgAction::SetTrue)]
    include_dirs: bool,
    #[arg(long = "include-hidden", action = ArgAction::SetTrue)]
    include_hidden: bool,
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,
    /// Show an instructional header above the file list
    #[arg(long, action = ArgAction::SetTrue)]
    header: bool,
    /// Align edits with a diff, so deleting a line deletes the file
    #[arg(long, action = ArgAction::SetTrue)]
    diff: bool,
    #[arg(long, value_name = "COMMAND")]
    editor: Option<String>,
    /// Apply without asking for confirmation
    #[arg(short = 'y', long = "yes", action = ArgAction::SetTrue)]
    auto_apply: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    #[arg(long = "color", value_enum)]
    color: Option<ColorChoice>,
    /// Do not record applied changes in .massren/history.jsonl
    #[arg(long = "no-log", action = ArgAction::SetTrue)]
    no_log: bool,
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct LogCommand {
    #[arg(long, default_value_t = 20)]
    tail: usize,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}
