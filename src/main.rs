use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use tracing::{info, warn};

use helperdoc::events::{self, HostEvent};
use helperdoc::hover;
use helperdoc::index::{HelperIndex, UpdateOutcome};
use helperdoc::logging;
use helperdoc::position::{LineIndex, Position};
use helperdoc::project::{scan_project, ProjectFilter, ScanOptions};
use helperdoc::report::{HelperReport, JsonFormatter, ReportFormatter, TextFormatter};

#[derive(Parser, Debug)]
#[command(name = "helperdoc", about = "Index template helpers and render their documentation")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every helper registered under a project root.
    Scan {
        #[command(flatten)]
        project: ProjectArgs,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Render the hover documentation at a position in a template document.
    Hover {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        cursor: CursorArgs,

        /// Print the fragment as JSON (contents plus range).
        #[arg(long)]
        json: bool,
    },
    /// List completion entries visible at a position in a template document.
    Complete {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        cursor: CursorArgs,

        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Index a project and keep the index current as files change.
    Watch {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(Args, Debug)]
struct ProjectArgs {
    /// Project root to index.
    root: PathBuf,

    /// Script file extensions to index, comma separated.
    #[arg(long, value_delimiter = ',')]
    ext: Option<Vec<String>>,

    /// Also index hidden files and directories.
    #[arg(long)]
    hidden: bool,
}

impl ProjectArgs {
    fn options(&self) -> ScanOptions {
        let options = ScanOptions {
            include_hidden: self.hidden,
            ..ScanOptions::default()
        };
        match &self.ext {
            Some(ext) => options.with_extensions(ext),
            None => options,
        }
    }

    fn root(&self) -> PathBuf {
        self.root.canonicalize().unwrap_or_else(|_| self.root.clone())
    }
}

#[derive(Args, Debug)]
struct CursorArgs {
    /// Template document containing the cursor.
    document: PathBuf,

    /// Zero-based line of the cursor.
    #[arg(long)]
    line: u32,

    /// Zero-based UTF-16 column of the cursor.
    #[arg(long)]
    column: u32,
}

impl CursorArgs {
    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.document)
            .wrap_err_with(|| format!("failed to read {}", self.document.display()))
    }

    fn offset(&self, text: &str) -> Result<usize> {
        let position = Position {
            line: self.line,
            character: self.column,
        };
        LineIndex::new(text).offset(position).ok_or_else(|| {
            eyre!(
                "line {} is past the end of {}",
                self.line,
                self.document.display()
            )
        })
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Scan { project, json } => run_scan(&project, json),
        Command::Hover { project, cursor, json } => run_hover(&project, &cursor, json),
        Command::Complete { project, cursor, json } => run_complete(&project, &cursor, json),
        Command::Watch { project } => run_watch(&project),
    }
}

fn index_project(project: &ProjectArgs) -> Result<(PathBuf, HelperIndex)> {
    let root = project.root();
    let mut index = HelperIndex::new();
    let summary = scan_project(&root, &project.options(), &mut index)?;
    if !summary.unreadable.is_empty() {
        warn!(count = summary.unreadable.len(), "some files could not be read");
    }
    Ok((root, index))
}

fn run_scan(project: &ProjectArgs, json: bool) -> Result<()> {
    let (root, index) = index_project(project)?;
    let report = HelperReport::from_index(&index, &root);
    let output = if json {
        JsonFormatter.format(&report)?
    } else {
        TextFormatter::default().format(&report)?
    };
    println!("{output}");
    Ok(())
}

fn run_hover(project: &ProjectArgs, cursor: &CursorArgs, json: bool) -> Result<()> {
    let (_, index) = index_project(project)?;
    let text = cursor.read()?;
    let offset = cursor.offset(&text)?;

    match hover::hover(&index, &text, offset) {
        Some(fragment) if json => {
            let json =
                serde_json::to_string_pretty(&fragment).wrap_err("failed to serialize hover")?;
            println!("{json}");
        }
        Some(fragment) => println!("{}", fragment.contents.value),
        None if json => println!("null"),
        None => info!("no helper at {}:{}", cursor.line, cursor.column),
    }
    Ok(())
}

fn run_complete(project: &ProjectArgs, cursor: &CursorArgs, json: bool) -> Result<()> {
    let (_, index) = index_project(project)?;
    let text = cursor.read()?;
    let offset = cursor.offset(&text)?;
    let entries = hover::completions(&index, &text, offset);

    if json {
        let json =
            serde_json::to_string_pretty(&entries).wrap_err("failed to serialize completions")?;
        println!("{json}");
    } else {
        for entry in &entries {
            println!("{}\t{}", entry.label, entry.detail.as_deref().unwrap_or(""));
        }
    }
    Ok(())
}

fn run_watch(project: &ProjectArgs) -> Result<()> {
    let (root, mut index) = index_project(project)?;
    println!(
        "Watching {} ({} files, {} helpers)",
        root.display(),
        index.len(),
        index.total_helpers()
    );

    let (tx, rx) = mpsc::channel::<HostEvent>();
    let filter = ProjectFilter::new(&root, project.options());
    let _watcher = events::spawn_watcher(&root, tx, filter)?;

    while let Ok(event) = rx.recv() {
        apply_event(&mut index, &event);
    }
    Ok(())
}

fn apply_event(index: &mut HelperIndex, event: &HostEvent) {
    match event {
        HostEvent::Changed(path) => match fs::read_to_string(path) {
            Ok(text) => match index.update(path, &text) {
                UpdateOutcome::Replaced { helpers } => {
                    println!("updated {} ({helpers} helpers)", display_name(path));
                }
                UpdateOutcome::Unchanged { .. } => {}
            },
            // Editors often write via rename; a vanished file counts as removed.
            Err(err) => {
                info!(path = %path.display(), error = %err, "changed file unreadable, dropping");
                if index.invalidate(path) {
                    println!("removed {}", display_name(path));
                }
            }
        },
        HostEvent::Removed(path) => {
            if index.invalidate(path) {
                println!("removed {}", display_name(path));
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
