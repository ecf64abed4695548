use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use strata_llm::LlmProvider;
use strata_parse::{ParserDispatcher, ParserOptions};
use strata_pipeline::config::{Config, DEFAULT_CONFIG_PATH};
use strata_pipeline::index::{FlatIndex, entries_path, load_entries};
use strata_pipeline::{PipelineOrchestrator, ProgressEvent, Stage, StageOutput};

/// Staged semantic indexing of polyglot source repositories.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (falls back to $STRATA_CONFIG, then strata.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse, link, enrich, embed and index a project
    Index {
        /// Project root
        #[arg(long)]
        root: Option<PathBuf>,
        /// Index only these files (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// Leave these files out (repeatable)
        #[arg(long)]
        exclude: Vec<PathBuf>,
    },
    /// Query a saved index
    Search {
        query: String,
        /// Number of hits to print
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,
    },
    /// Print the items extracted from files as JSON
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Force the regex fallback parsers
        #[arg(long)]
        no_ast: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config);
    let mut config = Config::load(&config_path)?;

    match cli.command {
        Command::Index {
            root,
            files,
            exclude,
        } => {
            if let Some(root) = root {
                config.project.root = root;
            }
            if !files.is_empty() {
                config.project.files = files;
            }
            config.project.exclude.extend(exclude);
            run_index(&config).await
        }
        Command::Search { query, top_k } => run_search(&config, &query, top_k).await,
        Command::Parse { files, no_ast } => run_parse(&config, &files, no_ast),
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config_path(cli: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli {
        return path;
    }
    if let Ok(path) = std::env::var("STRATA_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

async fn run_index(config: &Config) -> anyhow::Result<()> {
    let provider = config.llm.build_provider()?;
    tracing::info!(
        provider = provider.name(),
        root = %config.project.root.display(),
        "starting pipeline"
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::debug!(
                stage = %event.stage,
                percentage = event.percentage,
                processed = event.items_processed,
                total = event.total_items,
                "{}",
                event.message
            );
        }
    });

    let orchestrator = PipelineOrchestrator::from_config(config, provider).with_progress(tx);
    let results = orchestrator.run().await;
    drop(orchestrator);
    let _ = progress.await;
    let results = results?;

    for (stage, output) in results.iter() {
        println!("{stage}: {}", output.stats_json());
    }
    if let Some(StageOutput::Indexing(indexing)) = results.get(Stage::Indexing) {
        println!("index: {}", indexing.index_path.display());
        println!("entries: {}", indexing.entries_path.display());
    }
    Ok(())
}

async fn run_search(config: &Config, query: &str, top_k: usize) -> anyhow::Result<()> {
    let index_path = config.index_path();
    let index = FlatIndex::load(&index_path)
        .await
        .with_context(|| format!("failed to load index {}", index_path.display()))?;
    let entries = load_entries(&entries_path(&index_path))
        .await
        .context("failed to load index entries")?;

    let provider = config.llm.build_provider()?;
    let embedding = provider
        .embed_batch(&[query.to_owned()])
        .await?
        .into_iter()
        .next()
        .context("provider returned no embedding for the query")?;

    for (ordinal, score) in index.search(&embedding, top_k)? {
        let Some(entry) = entries.get(ordinal) else {
            tracing::warn!(ordinal, "index hit has no side-table entry");
            continue;
        };
        println!(
            "{score:.4}  {id}  {kind}  {path}",
            id = entry.id,
            kind = entry.item_type,
            path = entry.file_path
        );
    }
    Ok(())
}

fn run_parse(config: &Config, files: &[PathBuf], no_ast: bool) -> anyhow::Result<()> {
    let dispatcher = ParserDispatcher::new(ParserOptions {
        ast: config.parsing.ast && !no_ast,
    });
    let root = config
        .project
        .root
        .canonicalize()
        .unwrap_or_else(|_| config.project.root.clone());

    let mut items = Vec::new();
    for file in files {
        items.extend(parse_one(&dispatcher, file, &root)?);
    }
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

fn parse_one(
    dispatcher: &ParserDispatcher,
    file: &Path,
    root: &Path,
) -> anyhow::Result<Vec<strata_parse::AiItem>> {
    let path = file
        .canonicalize()
        .with_context(|| format!("cannot access {}", file.display()))?;
    dispatcher
        .parse_file(&path, root)
        .with_context(|| format!("failed to parse {}", file.display()))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use serial_test::serial;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn index_accepts_repeated_files() {
        let cli = Cli::try_parse_from([
            "strata", "index", "--root", "repo", "--file", "a.go", "--file", "b.py", "--exclude",
            "c.ts",
        ])
        .unwrap();
        let Command::Index {
            root,
            files,
            exclude,
        } = cli.command
        else {
            panic!("expected index command");
        };
        assert_eq!(root, Some(PathBuf::from("repo")));
        assert_eq!(files, [PathBuf::from("a.go"), PathBuf::from("b.py")]);
        assert_eq!(exclude, [PathBuf::from("c.ts")]);
    }

    #[test]
    fn search_defaults_to_ten_hits() {
        let cli = Cli::try_parse_from(["strata", "search", "open a socket"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Search { ref query, top_k: 10 } if query == "open a socket"
        ));
    }

    #[test]
    fn parse_requires_files() {
        assert!(Cli::try_parse_from(["strata", "parse"]).is_err());
    }

    #[test]
    #[serial]
    fn config_path_precedence() {
        unsafe { std::env::remove_var("STRATA_CONFIG") };
        assert_eq!(resolve_config_path(None), PathBuf::from("strata.toml"));

        unsafe { std::env::set_var("STRATA_CONFIG", "/etc/strata.toml") };
        assert_eq!(resolve_config_path(None), PathBuf::from("/etc/strata.toml"));
        assert_eq!(
            resolve_config_path(Some(PathBuf::from("local.toml"))),
            PathBuf::from("local.toml")
        );
        unsafe { std::env::remove_var("STRATA_CONFIG") };
    }

    #[test]
    fn parse_one_reports_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
        std::fs::write(root.join("notes.txt"), "hi\n").unwrap();

        let dispatcher = ParserDispatcher::default();
        let items = parse_one(&dispatcher, &root.join("main.go"), &root).unwrap();
        assert_eq!(items[0].file_path, "main.go");
        assert!(parse_one(&dispatcher, &root.join("notes.txt"), &root).is_err());
        assert!(parse_one(&dispatcher, &root.join("missing.go"), &root).is_err());
    }
}
