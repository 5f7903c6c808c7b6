//! CLI entry point for `emlrender`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use emlrender::config::{self, Config};
use emlrender::convert::{nested, Operation, Target};
use emlrender::export::output::{FileReport, Job, OutputKind};
use emlrender::model::{Message, Part, PartBody};
use emlrender::render::{self, HtmlRenderer, Renderer};

#[derive(Parser)]
#[command(
    name = "emlrender",
    version,
    about = "Convert .eml messages to HTML or PDF",
    long_about = "Convert .eml messages to HTML or PDF.\n\n\
        The most deeply nested forwarded message is rendered. Optionally the \
        most deeply nested document attachment is extracted instead."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// .eml files to convert (same as `emlrender convert FILE...`)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, env = "EMLRENDER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert messages
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output directory (defaults to each file's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write HTML even if a document renderer is configured
        #[arg(long)]
        html: bool,
        /// Extract the deepest attachment with this suffix when there is one
        #[arg(long, value_name = "SUFFIX", num_args = 0..=1, default_missing_value = ".pdf")]
        extract: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show the part tree of a message
    Inspect {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Flags of a `convert` run.
struct ConvertArgs {
    output: Option<PathBuf>,
    html: bool,
    extract: Option<String>,
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Convert {
            files,
            output,
            html,
            extract,
            json,
        }) => cmd_convert(
            &files,
            &config,
            ConvertArgs {
                output,
                html,
                extract,
                json,
            },
        ),
        Some(Commands::Inspect { path, json }) => cmd_inspect(&path, &config, json),
        Some(Commands::InitConfig { force }) => cmd_init_config(force),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None if cli.files.is_empty() => {
            Cli::command().print_help()?;
            Ok(())
        }
        None => cmd_convert(
            &cli.files,
            &config,
            ConvertArgs {
                output: None,
                html: false,
                extract: None,
                json: false,
            },
        ),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "emlrender.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "emlrender", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Write the default configuration to the standard location.
fn cmd_init_config(force: bool) -> anyhow::Result<()> {
    let path = config::config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    config::save_config(&Config::default())?;
    println!("  Wrote {}", path.display());
    Ok(())
}

/// Convert every file, continuing past failures.
fn cmd_convert(files: &[PathBuf], config: &Config, args: ConvertArgs) -> anyhow::Result<()> {
    let configured = render::from_config(&config.render);
    let renderer: &dyn Renderer = if args.html {
        &HtmlRenderer
    } else {
        configured.as_ref()
    };

    let mut job = Job::new(config, renderer).with_output_dir(args.output);
    if let Some(suffix) = args.extract {
        job = job.with_operation(Operation::ExtractAttachment { suffix });
    }

    let pb = if files.len() > 1 && !args.json {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Converting [{bar:40.cyan/blue}] {pos}/{len}")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let start = Instant::now();
    let mut reports = Vec::with_capacity(files.len());
    let mut failures = Vec::new();

    for (i, path) in files.iter().enumerate() {
        pb.set_position(i as u64);
        match job.run(path) {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Conversion failed");
                failures.push((path.clone(), e.to_string()));
            }
        }
    }
    pb.finish_and_clear();

    if args.json {
        print_reports_json(&reports, &failures)?;
    } else {
        print_reports_table(&reports, &failures, start.elapsed());
    }

    if !failures.is_empty() {
        anyhow::bail!("{} of {} file(s) failed", failures.len(), files.len());
    }
    Ok(())
}

/// Print the part tree and nesting summary of one message.
fn cmd_inspect(path: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let message = emlrender::parser::eml::load_eml(path)?;
    let options = config.convert_options();
    let depth = nested::resolve(&message, &Target::Message, &options.resolve)?.depth;

    if json {
        let output = serde_json::json!({
            "file": path.to_string_lossy(),
            "subject": message.subject,
            "content_type": message.content_type,
            "nested_depth": depth,
            "tree": part_json(&message.root),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {:<16} {}", "File", path.display());
    println!(
        "  {:<16} {}",
        "Subject",
        message.subject.as_deref().unwrap_or("(none)")
    );
    println!("  {:<16} {}", "Nested depth", depth);
    println!();
    print_part(&message.root, 1);
    println!();
    Ok(())
}

fn print_part(part: &Part, indent: usize) {
    use humansize::{format_size, BINARY};

    let pad = "  ".repeat(indent);
    let mut line = format!("{pad}{}", part.mime);
    if let Some(name) = &part.filename {
        line.push_str(&format!("  \"{name}\""));
    }
    if let Some(cid) = &part.content_id {
        line.push_str(&format!("  <{cid}>"));
    }
    if !matches!(part.body, PartBody::Container(_)) {
        let kind = if part.is_attachment() { "attachment" } else { "body" };
        line.push_str(&format!(
            "  [{kind}, {}]",
            format_size(part.content().len(), BINARY)
        ));
    }
    println!("{line}");

    match &part.body {
        PartBody::Container(children) => {
            for child in children {
                print_part(child, indent + 1);
            }
        }
        PartBody::Message(inner) => print_message(inner, indent + 1),
        _ => {}
    }
}

fn print_message(message: &Message, indent: usize) {
    let pad = "  ".repeat(indent);
    println!(
        "{pad}Subject: {}",
        message.subject.as_deref().unwrap_or("(none)")
    );
    print_part(&message.root, indent);
}

fn part_json(part: &Part) -> serde_json::Value {
    let children: Vec<serde_json::Value> = match &part.body {
        PartBody::Container(children) => children.iter().map(part_json).collect(),
        PartBody::Message(inner) => vec![part_json(&inner.root)],
        _ => Vec::new(),
    };
    serde_json::json!({
        "content_type": part.mime.to_string(),
        "filename": part.filename,
        "content_id": part.content_id,
        "attachment": part.is_attachment(),
        "size": part.content().len(),
        "children": children,
    })
}

/// Print conversion results as a human-readable table.
fn print_reports_table(
    reports: &[FileReport],
    failures: &[(PathBuf, String)],
    elapsed: std::time::Duration,
) {
    use humansize::{format_size, BINARY};

    println!();
    for report in reports {
        let kind = match report.kind {
            OutputKind::Rendered => "rendered",
            OutputKind::Attachment => "attachment",
            OutputKind::Nothing => "nothing to convert",
        };
        let output = report
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<40} {:<20} depth {:<3} {:>10}  {}",
            report.source.display(),
            kind,
            report.depth,
            format_size(report.size, BINARY),
            output
        );
    }
    for (path, error) in failures {
        println!("  {:<40} failed: {}", path.display(), error);
    }
    println!();
    println!(
        "  {} converted, {} failed in {:.2?}",
        reports.len(),
        failures.len(),
        elapsed
    );
    println!();
}

/// Print conversion results as JSON.
fn print_reports_json(reports: &[FileReport], failures: &[(PathBuf, String)]) -> anyhow::Result<()> {
    let failed: Vec<serde_json::Value> = failures
        .iter()
        .map(|(path, error)| {
            serde_json::json!({
                "source": path.to_string_lossy(),
                "error": error,
            })
        })
        .collect();

    let output = serde_json::json!({
        "converted": reports,
        "failed": failed,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
