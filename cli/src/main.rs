//! `jct` — the command-line adapter over the `jct-core` value engine.
//!
//! This binary is deliberately thin: argument parsing, short-name file
//! resolution, exit-code mapping, stdout formatting, and the `restore`
//! overlayfs plumbing. Every operation that actually touches a JSON tree is
//! delegated to `jct-core`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use jct_core::jsonpath::{EvalOptions, OutputMode};
use jct_core::value::Value;
use jct_core::{dotpath, kernel, parser, persist, serializer};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "jct")]
#[command(about = "Read, mutate, merge, diff, and query JSON configuration files")]
#[command(version)]
struct Cli {
    /// Trace short-name resolution steps to stderr.
    #[arg(long, global = true)]
    trace_resolve: bool,

    /// Enable verbose logging (sets log level to debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file: an explicit path, or a short name resolved
    /// against `./<name>`, `./<name>.json`, `/etc/<name>.json`.
    target: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a value at a dot-path from the config file.
    Get { path: String },
    /// Set a value at a dot-path in the config file.
    Set { path: String, value: String },
    /// Create a new empty config file. Fails if the target already exists.
    Create,
    /// Print the entire config file.
    Print,
    /// Merge another JSON document into the config file.
    Import { source: PathBuf },
    /// Restore the config file to its pre-overlay state.
    Restore,
    /// Evaluate a JSONPath expression against the config file.
    Path {
        expr: String,
        /// What to assemble from the matched nodes.
        #[arg(long, value_enum, default_value_t = ModeArg::Values)]
        mode: ModeArg,
        /// Cap the number of results. `0` (the default) means no limit.
        #[arg(long, default_value_t = 0)]
        limit: i64,
        /// Abort with a nonzero exit on any parse error or unsupported
        /// construct, instead of returning an empty result set.
        #[arg(long)]
        strict: bool,
        /// Pretty-print the result (canonical 2-space indented form)
        /// instead of the compact single-line form.
        #[arg(long)]
        pretty: bool,
        /// In `values` mode, emit a single matching value directly instead
        /// of wrapping it in a one-element array.
        #[arg(long)]
        unwrap_single: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Values,
    Paths,
    Pairs,
}

impl From<ModeArg> for OutputMode {
    fn from(val: ModeArg) -> Self {
        match val {
            ModeArg::Values => OutputMode::Values,
            ModeArg::Paths => OutputMode::Paths,
            ModeArg::Pairs => OutputMode::Pairs,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    ExitCode::from(dispatch(&cli) as u8)
}

fn dispatch(cli: &Cli) -> i32 {
    tracing::debug!(target = %cli.target, "dispatching command");
    match &cli.command {
        Commands::Get { path } => match resolve_existing(&cli.target, cli.trace_resolve) {
            Ok(resolved) => run(handle_get(&resolved, path)),
            Err(code) => code,
        },
        Commands::Print => match resolve_existing(&cli.target, cli.trace_resolve) {
            Ok(resolved) => run(handle_print(&resolved)),
            Err(code) => code,
        },
        Commands::Restore => match resolve_existing(&cli.target, cli.trace_resolve) {
            Ok(resolved) => handle_restore(&resolved),
            Err(code) => code,
        },
        Commands::Path {
            expr,
            mode,
            limit,
            strict,
            pretty,
            unwrap_single,
        } => match resolve_existing(&cli.target, cli.trace_resolve) {
            Ok(resolved) => run(handle_path(&resolved, expr, *mode, *limit, *strict, *pretty, *unwrap_single)),
            Err(code) => code,
        },
        Commands::Set { path, value } => match resolve_for_set(&cli.target, cli.trace_resolve) {
            Ok(resolved) => run(handle_set(&resolved, path, value)),
            Err(code) => code,
        },
        Commands::Import { source } => match resolve_for_set(&cli.target, cli.trace_resolve) {
            Ok(resolved) => run(handle_import(&resolved, source)),
            Err(code) => code,
        },
        Commands::Create => {
            if !is_explicit_path(&cli.target) {
                eprintln!(
                    "jct: 'create' requires an explicit path; to create a new file, supply an explicit path (e.g., ./{}.json)",
                    cli.target
                );
                return 2;
            }
            run(handle_create(Path::new(&cli.target)))
        }
    }
}

/// Print an `anyhow` error chain as a one-line diagnostic and map it to the
/// generic failure exit code. The distinct exit codes (2, 3, 4, 5, 13) are
/// all CLI dispatch policy decided before a `jct-core` call is even made
/// (see `resolve_existing`/`resolve_for_set`/`handle_restore`), so every
/// error that actually originates inside `jct-core` collapses to 1 here.
fn run(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers — each calls into jct-core and does nothing else.
// ---------------------------------------------------------------------------

fn handle_get(config_file: &Path, path: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    tracing::debug!(file = %config_file.display(), %path, "get");
    let config = persist::load(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;

    let value = dotpath::get_nested(&config, path)
        .with_context(|| format!("key '{path}' not found in config file"))?;
    println!("{}", format_for_display(value));
    Ok(())
}

fn handle_set(config_file: &Path, path: &str, value_str: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    tracing::debug!(file = %config_file.display(), %path, "set");
    let mut config = persist::load(config_file).unwrap_or_else(|_| Value::Object(Vec::new()));

    dotpath::set_nested(&mut config, path, value_str)
        .with_context(|| format!("failed to set key '{path}' in config file"))?;

    persist::save(config_file, &config)
        .with_context(|| format!("failed to save config file '{}'", config_file.display()))
}

fn handle_create(config_file: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    anyhow::ensure!(!config_file.exists(), "config file '{}' already exists", config_file.display());

    persist::save(config_file, &Value::Object(Vec::new()))
        .with_context(|| format!("failed to save config file '{}'", config_file.display()))
}

fn handle_print(config_file: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    let config = persist::load(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;
    let text = serializer::serialize(&config).context("failed to serialize config file")?;
    print!("{text}");
    Ok(())
}

fn handle_import(dest_file: &Path, source_file: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    let mut dest = persist::load(dest_file).unwrap_or_else(|_| Value::Object(Vec::new()));
    let source_bytes = std::fs::read(source_file)
        .with_context(|| format!("failed to read source file '{}'", source_file.display()))?;
    let source = parser::parse(&source_bytes)
        .with_context(|| format!("failed to parse source file '{}'", source_file.display()))?
        .value;

    kernel::merge_into(&mut dest, &source);

    persist::save(dest_file, &dest)
        .with_context(|| format!("failed to save config file '{}'", dest_file.display()))
}

fn handle_path(
    config_file: &Path,
    expr: &str,
    mode: ModeArg,
    limit: i64,
    strict: bool,
    pretty: bool,
    unwrap_single: bool,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let config = persist::load(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;

    let options = EvalOptions {
        mode: mode.into(),
        limit,
        strict,
        unwrap_single,
    };

    let result = jct_core::jsonpath::evaluate(&config, expr, &options).context("jsonpath evaluation failed")?;

    if pretty {
        let text = serializer::serialize(&result).context("failed to serialize result")?;
        print!("{text}");
    } else {
        println!("{}", compact::serialize(&result));
    }
    Ok(())
}

/// `restore` undoes an OverlayFS-backed edit: removes the overlay copy of
/// the file so the next read falls through to the read-only ROM layer, then
/// remounts `/` so the kernel drops its cached overlay entry. Requires an
/// absolute path since the ROM/overlay mount points are fixed.
fn handle_restore(config_file: &Path) -> i32 {
    tracing::info!(file = %config_file.display(), "restoring overlay file to ROM state");
    let config_str = match config_file.to_str() {
        Some(s) if !s.is_empty() => s,
        _ => {
            eprintln!("Error: Invalid config file path.");
            return 5;
        }
    };

    if !config_str.starts_with('/') {
        eprintln!("Error: Config file path must be absolute (start with '/'). Got: '{config_str}'");
        return 5;
    }

    let rom_path = PathBuf::from(format!("/rom{config_str}"));
    let overlay_path = PathBuf::from(format!("/overlay{config_str}"));

    if !rom_path.exists() {
        eprintln!("Error: Original file '{}' not found", rom_path.display());
        return 1;
    }
    if !overlay_path.exists() {
        eprintln!("Error: The file is original, nothing to restore");
        return 2;
    }

    if let Err(e) = std::fs::remove_file(&overlay_path) {
        eprintln!("Error: Failed to remove overlay file '{}': {e}", overlay_path.display());
        return 3;
    }

    match std::process::Command::new("mount").args(["-o", "remount", "/"]).status() {
        Ok(status) if status.success() => 0,
        Ok(status) => {
            eprintln!("Error: Failed to remount overlay filesystem: exit status {status}");
            4
        }
        Err(e) => {
            eprintln!("Error: Failed to remount overlay filesystem: {e}");
            4
        }
    }
}

/// Formats a single value the way a shell script expects: scalars print
/// bare (no JSON quoting on strings), containers print canonical pretty
/// JSON.
fn format_for_display(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => serializer::format_number_for_display(*n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => serializer::serialize(value)
            .unwrap_or_else(|e| format!("Error: Failed to convert to JSON string: {e}"))
            .trim_end()
            .to_string(),
    }
}

// ---------------------------------------------------------------------------
// Target resolution (adapter-only; out of the jct-core contract).
// ---------------------------------------------------------------------------

fn is_explicit_path(target: &str) -> bool {
    target.contains('/') || target.contains('\\') || target.ends_with(".json")
}

/// Resolve a target that the command needs to already exist and be
/// readable (`get`, `print`, `restore`, `path`). Returns the resolved path
/// or the process exit code to use when resolution fails.
fn resolve_existing(target: &str, trace: bool) -> Result<PathBuf, i32> {
    if is_explicit_path(target) {
        if trace {
            eprintln!("[trace] explicit path used: {target}");
        }
        return Ok(PathBuf::from(target));
    }
    resolve_short_name(target, trace)
}

/// Resolve a target for `set`/`import`: a short name must resolve to an
/// existing file, but an explicit path is passed through as-is so the
/// command may create it.
fn resolve_for_set(target: &str, trace: bool) -> Result<PathBuf, i32> {
    if is_explicit_path(target) {
        return Ok(PathBuf::from(target));
    }
    match resolve_short_name(target, trace) {
        Ok(path) => Ok(path),
        Err(2) => {
            eprintln!("jct: to create a new file, supply an explicit path (e.g., ./{target}.json)");
            Err(2)
        }
        Err(code) => Err(code),
    }
}

fn resolve_short_name(target: &str, trace: bool) -> Result<PathBuf, i32> {
    let candidates = [
        PathBuf::from(format!("./{target}")),
        PathBuf::from(format!("./{target}.json")),
        PathBuf::from(format!("/etc/{target}.json")),
    ];

    for candidate in &candidates {
        if trace {
            eprint!("[trace] checking {}... ", candidate.display());
        }
        let metadata = match std::fs::symlink_metadata(candidate).and_then(|_| candidate.metadata()) {
            Ok(m) => m,
            Err(_) => {
                if trace {
                    eprintln!("not found");
                }
                continue;
            }
        };
        if metadata.is_dir() {
            if trace {
                eprintln!("is a directory, skip");
            }
            continue;
        }
        if !metadata.is_file() {
            if trace {
                eprintln!("not a regular file, skip");
            }
            continue;
        }
        if std::fs::File::open(candidate).is_err() {
            if trace {
                eprintln!("exists but not readable -> permission denied");
            }
            eprintln!("jct: permission denied: {}", candidate.display());
            return Err(13);
        }
        if trace {
            eprintln!("selected\n[trace] resolved to: {}", candidate.display());
        }
        return Ok(candidate.clone());
    }

    if trace {
        eprintln!("[trace] no matching file found for '{target}'");
    }
    let tried: Vec<String> = candidates.iter().map(|c| c.display().to_string()).collect();
    eprintln!("jct: no JSON file found for '{target}'; tried: {}", tried.join(", "));
    Err(2)
}

mod compact {
    //! A minimal single-line JSON writer for `path`'s non-`--pretty` output.
    //! The canonical multi-line form lives in `jct_core::serializer`; this
    //! is purely a CLI display concern and carries no on-disk meaning.
    use jct_core::value::Value;

    pub fn serialize(value: &Value) -> String {
        let mut out = String::new();
        write(&mut out, value);
        out
    }

    fn write(out: &mut String, value: &Value) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Number(n) => out.push_str(&jct_core::serializer::format_number_for_display(*n)),
            Value::String(s) => write_string(out, s),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write(out, item);
                }
                out.push(']');
            }
            Value::Object(members) => {
                let mut sorted: Vec<&(String, Value)> = members.iter().collect();
                sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
                out.push('{');
                for (i, (key, val)) in sorted.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_string(out, key);
                    out.push(':');
                    write(out, val);
                }
                out.push('}');
            }
        }
    }

    fn write_string(out: &mut String, s: &str) {
        out.push('"');
        for ch in s.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('"');
    }
}
