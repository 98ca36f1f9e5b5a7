mod logger;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use logger::StderrLogger;
use pdf_async_runtime::{PdfCommand, PdfUpdate, worker_task};
use pdf_sort::{CancelToken, DocumentDescriptor, SortOptions, SortRequest, SortSummary};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(
    name = "pdfsort",
    about = "Sort a batch of scanned documents by a key printed on their first page",
    version
)]
struct Cli {
    /// Log more detail (repeat for trace output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reorder the documents of a PDF and write the result
    Sort {
        #[command(flatten)]
        keys: KeyArgs,

        /// Output PDF file (default: <input>-sorted.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Literal text to replace on every page
        #[arg(long)]
        placeholder: Option<String>,

        /// CSV file whose first column holds one replacement per sorted document
        #[arg(short, long)]
        replacements: Option<PathBuf>,
    },

    /// Show the order documents would be written in, without writing
    Inspect {
        #[command(flatten)]
        keys: KeyArgs,
    },
}

#[derive(Args)]
struct KeyArgs {
    /// Input PDF file
    #[arg(short, long)]
    input: PathBuf,

    /// Pages per document
    #[arg(short, long)]
    group_size: Option<usize>,

    /// Regular expression locating the key on each document's first page
    #[arg(short, long)]
    pattern: Option<String>,

    /// How the key is read from the match
    #[arg(long, value_enum)]
    key_mode: Option<KeyModeArg>,

    /// Order of keys in the output
    #[arg(long, value_enum)]
    direction: Option<DirectionArg>,

    /// Sort largest key first (same as --direction descending)
    #[arg(long, conflicts_with = "direction")]
    descending: bool,

    /// JSON options file; flags given on the command line take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyModeArg {
    Numeric,
    RawText,
    None,
}

impl From<KeyModeArg> for pdf_sort::KeyMode {
    fn from(arg: KeyModeArg) -> Self {
        match arg {
            KeyModeArg::Numeric => Self::Numeric,
            KeyModeArg::RawText => Self::RawText,
            KeyModeArg::None => Self::None,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Ascending,
    Descending,
}

impl From<DirectionArg> for pdf_sort::SortDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Ascending => Self::Ascending,
            DirectionArg::Descending => Self::Descending,
        }
    }
}

impl KeyArgs {
    /// Options from `--config` (or defaults) with explicit flags applied on top
    async fn resolve_options(&self, worker: &mut WorkerHandle) -> Result<SortOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let update = worker
                    .request(PdfCommand::SortLoadConfig { path: path.clone() })
                    .await?;
                match update {
                    PdfUpdate::SortConfigLoaded { options } => options,
                    PdfUpdate::Error { message } => bail!(message),
                    other => bail!("Unexpected reply to config load: {other:?}"),
                }
            }
            None => SortOptions::default(),
        };
        self.apply_overrides(&mut options);
        Ok(options)
    }

    fn apply_overrides(&self, options: &mut SortOptions) {
        if let Some(group_size) = self.group_size {
            options.group_size = group_size;
        }
        if let Some(pattern) = &self.pattern {
            options.pattern = Some(pattern.clone());
        }
        if let Some(mode) = self.key_mode {
            options.key_mode = mode.into();
        }
        if let Some(direction) = self.direction {
            options.direction = direction.into();
        } else if self.descending {
            options.direction = pdf_sort::SortDirection::Descending;
        }
    }
}

/// Channels to the background worker
struct WorkerHandle {
    command_tx: mpsc::UnboundedSender<PdfCommand>,
    update_rx: mpsc::UnboundedReceiver<PdfUpdate>,
}

impl WorkerHandle {
    fn send(&self, command: PdfCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| anyhow!("Worker stopped unexpectedly"))
    }

    /// Send `command` and wait for the update that ends it, skipping progress
    async fn request(&mut self, command: PdfCommand) -> Result<PdfUpdate> {
        self.send(command)?;
        while let Some(update) = self.update_rx.recv().await {
            if update.is_final() {
                return Ok(update);
            }
        }
        bail!("Worker stopped unexpectedly")
    }

    /// Read the replacement list up front so problems show before the sort starts.
    ///
    /// An unreadable list is not fatal: placeholders are then left in place.
    async fn check_replacements(&mut self, path: &Path) -> Result<()> {
        let update = self
            .request(PdfCommand::SortLoadReplacements {
                path: path.to_owned(),
            })
            .await?;
        match update {
            PdfUpdate::SortReplacementsLoaded { path, values } => {
                log::info!("{} replacement values in {}", values.len(), path.display());
            }
            PdfUpdate::Error { message } => {
                log::warn!("{message}; placeholders will be left unchanged");
            }
            other => bail!("Unexpected reply to replacement load: {other:?}"),
        }
        Ok(())
    }
}

/// A status line on stderr, rewritten in place with `\r`
#[derive(Default)]
struct ProgressLine {
    open: bool,
}

impl ProgressLine {
    fn update(&mut self, operation: &str, current: usize, total: usize) {
        eprint!("\r{operation}: {current}/{total}");
        self.open = current != total;
        if !self.open {
            eprintln!();
        }
    }

    /// End a partially written line so later output starts on its own line
    fn finish(&mut self) {
        if self.open {
            eprintln!();
            self.open = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    StderrLogger::new(StderrLogger::level_for(cli.verbose, cli.quiet))
        .init()
        .context("Failed to install logger")?;

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let worker_join = tokio::spawn(worker_task(command_rx, update_tx));
    let mut worker = WorkerHandle {
        command_tx,
        update_rx,
    };

    match cli.command {
        Commands::Sort {
            keys,
            output,
            placeholder,
            replacements,
        } => {
            let mut options = keys.resolve_options(&mut worker).await?;
            if placeholder.is_some() {
                options.placeholder = placeholder;
            }
            if let (Some(path), Some(_)) = (&replacements, options.placeholder()) {
                worker.check_replacements(path).await?;
            }

            let mut request = SortRequest::new(&keys.input, options);
            request.output_path = output;
            request.replacements_path = replacements;

            let cancel = CancelToken::new();
            worker.send(PdfCommand::SortRun {
                request,
                cancel: cancel.clone(),
            })?;

            let summary = wait_for_sort(&mut worker.update_rx, &cancel, !cli.quiet).await?;
            print_summary(&summary);
        }

        Commands::Inspect { keys } => {
            let options = keys.resolve_options(&mut worker).await?;
            let update = worker
                .request(PdfCommand::SortPlan {
                    input_path: keys.input.clone(),
                    options,
                })
                .await?;
            match update {
                PdfUpdate::SortPlanned { documents, .. } => print_plan(&documents),
                PdfUpdate::Error { message } => bail!(message),
                other => bail!("Unexpected reply to plan: {other:?}"),
            }
        }
    }

    drop(worker);
    worker_join.await.context("Worker task failed")?;

    Ok(())
}

/// Wait for a sort to finish, cancelling it on Ctrl-C
async fn wait_for_sort(
    update_rx: &mut mpsc::UnboundedReceiver<PdfUpdate>,
    cancel: &CancelToken,
    show_progress: bool,
) -> Result<SortSummary> {
    let mut line = ProgressLine::default();
    loop {
        tokio::select! {
            update = update_rx.recv() => {
                if !matches!(update, Some(PdfUpdate::Progress { .. })) {
                    line.finish();
                }
                match update {
                    Some(PdfUpdate::Progress { operation, current, total }) => {
                        if show_progress {
                            line.update(&operation, current, total);
                        }
                    }
                    Some(PdfUpdate::SortComplete { summary }) => return Ok(summary),
                    Some(PdfUpdate::SortCancelled) => bail!("Sort cancelled, no output written"),
                    Some(PdfUpdate::Error { message }) => bail!(message),
                    Some(_) => {}
                    None => bail!("Worker stopped unexpectedly"),
                }
            },
            signal = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                signal.context("Failed to listen for Ctrl-C")?;
                line.finish();
                log::warn!("Interrupted, stopping after the current document");
                cancel.cancel();
            }
        }
    }
}

fn print_summary(summary: &SortSummary) {
    println!(
        "Sorted {} documents ({} pages) → {}",
        summary.document_count,
        summary.page_count,
        summary.output_path.display()
    );
    if summary.substitutions > 0 {
        println!("  Placeholders replaced: {}", summary.substitutions);
    }
}

fn print_plan(documents: &[DocumentDescriptor]) {
    println!("{:>8}  {:>8}  {:>11}  Key", "Position", "Document", "Pages");
    for (position, document) in documents.iter().enumerate() {
        let pages = format!("{}-{}", document.range.start + 1, document.range.end);
        println!(
            "{:>8}  {:>8}  {:>11}  {}",
            position + 1,
            document.ordinal + 1,
            pages,
            document.sort_key
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_sort::SortDirection;

    fn inspect_keys(args: &[&str]) -> KeyArgs {
        let argv = ["pdfsort", "inspect", "-i", "in.pdf"]
            .into_iter()
            .chain(args.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Inspect { keys } => keys,
            Commands::Sort { .. } => panic!("Expected inspect"),
        }
    }

    fn start_worker() -> WorkerHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        tokio::spawn(worker_task(command_rx, update_tx));
        WorkerHandle {
            command_tx,
            update_rx,
        }
    }

    #[test]
    fn test_direction_flag_overrides_config() {
        let descending = SortOptions {
            direction: SortDirection::Descending,
            ..Default::default()
        };

        let mut options = descending.clone();
        inspect_keys(&["--direction", "ascending"]).apply_overrides(&mut options);
        assert_eq!(options.direction, SortDirection::Ascending);

        let mut options = descending.clone();
        inspect_keys(&[]).apply_overrides(&mut options);
        assert_eq!(options.direction, SortDirection::Descending);

        let mut options = SortOptions::default();
        inspect_keys(&["--descending"]).apply_overrides(&mut options);
        assert_eq!(options.direction, SortDirection::Descending);

        let both = ["pdfsort", "inspect", "-i", "in.pdf", "--descending", "--direction", "ascending"];
        assert!(Cli::try_parse_from(both).is_err());
    }

    #[tokio::test]
    async fn test_config_is_loaded_by_worker() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("sort.json");
        SortOptions {
            group_size: 3,
            direction: SortDirection::Descending,
            ..Default::default()
        }
        .save(&config)
        .await
        .unwrap();

        let mut worker = start_worker();
        let keys = inspect_keys(&["--config", config.to_str().unwrap(), "--direction", "ascending"]);
        let options = keys.resolve_options(&mut worker).await.unwrap();
        assert_eq!(options.group_size, 3);
        assert_eq!(options.direction, SortDirection::Ascending);

        let missing = dir.path().join("missing.json");
        let keys = inspect_keys(&["--config", missing.to_str().unwrap()]);
        let err = keys.resolve_options(&mut worker).await.unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[tokio::test]
    async fn test_unreadable_replacements_are_not_fatal() {
        let mut worker = start_worker();
        worker
            .check_replacements(Path::new("/definitely/not/here.csv"))
            .await
            .unwrap();
    }

    #[test]
    fn test_progress_line_closes_partial_line() {
        let mut line = ProgressLine::default();
        line.update("Scanning", 1, 4);
        assert!(line.open);
        line.finish();
        assert!(!line.open);

        line.update("Rebuilding", 4, 4);
        assert!(!line.open);
    }
}
