//! # devx CLI
//!
//! | Command | Description |
//! |---------|-------------|
//! | `devx commit` | Stage changes and commit with an AI-generated message |
//! | `devx agentenv init` | Extract the default template tree to `.agentenv/` |
//! | `devx agentenv analyse` | Produce `analysis.gen.md` via an agent CLI |
//! | `devx agentenv generate` | Render per-provider files and sidecars |
//! | `devx kwb build` | Index the source tree into the knowledge base |
//! | `devx kwb search` | Query the knowledge base |
//! | `devx kwb stats` | Show index statistics |
//! | `devx kwb serve` | Serve the knowledge base over MCP stdio |
//!
//! All commands exit `0` on success and `1` on any reported error.
//! Logs go to stderr; control the level with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use devx::{agentenv, commit, kwb};

/// devx — developer-assistance toolkit: AI commit messages, agent
/// environment generation, and a knowledge-base MCP server.
#[derive(Parser)]
#[command(
    name = "devx",
    about = "Developer-assistance toolkit: AI commits, agent environments, knowledge base",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage changes and commit with an AI-generated message.
    ///
    /// Fans the staged diff out to every available LLM provider, lets you
    /// pick a candidate (or picks one automatically with --auto), then
    /// commits and optionally pushes and tags.
    Commit {
        /// Providers to query (openai, claude, gemini); default: all available.
        #[arg(short, long, value_delimiter = ',')]
        providers: Vec<String>,

        /// Per-provider request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Custom prompt template; {branch}, {files}, {diff} are substituted.
        #[arg(long, default_value = "")]
        prompt: String,

        /// Use the first reply and cancel the rest.
        #[arg(long)]
        first: bool,

        /// Skip the interactive UI and commit with any suggestion.
        #[arg(short, long)]
        auto: bool,

        /// Show what would be committed without committing.
        #[arg(long)]
        dry_run: bool,

        /// Exclude pattern (repeatable).
        #[arg(long = "exclude")]
        exclude_patterns: Vec<String>,

        /// Only include paths matching a pattern (repeatable).
        #[arg(long = "include-only")]
        include_patterns: Vec<String>,

        /// Transformer modules to run, in order.
        #[arg(long, value_delimiter = ',', default_value = "jiraPrefixDetector")]
        modules: Vec<String>,

        /// Ask for a multi-line commit message.
        #[arg(long)]
        multi_line: bool,

        /// Push the branch (and tag) after committing.
        #[arg(long)]
        push: bool,

        /// Create a tag after committing: major, minor, or patch.
        #[arg(long, default_value = "")]
        tag: String,

        /// Honor the global gitignore when staging.
        #[arg(long)]
        use_global_gitignore: bool,
    },

    /// Generate AI coding-agent environments from a project config.
    Agentenv {
        #[command(subcommand)]
        action: AgentenvAction,
    },

    /// Knowledge-base indexer and MCP server.
    Kwb {
        /// Directory to index.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Index file location.
        #[arg(long, default_value = ".devx/kwb.db")]
        index: PathBuf,

        /// Extra basenames to index (repeatable).
        #[arg(long = "extra-extension")]
        extra_extensions: Vec<String>,

        /// Extra directory names to skip (repeatable).
        #[arg(long = "exclude-dir")]
        exclude_dirs: Vec<String>,

        /// Skip files larger than this many bytes.
        #[arg(long, default_value_t = 1_048_576)]
        max_file_size: u64,

        /// Documents per index batch.
        #[arg(long, default_value_t = 100)]
        batch_size: usize,

        /// Index engine flavor: scorch or upsidedown.
        #[arg(long, default_value = "scorch")]
        index_type: String,

        /// Search timeout in seconds.
        #[arg(long, default_value_t = 10)]
        search_timeout: u64,

        /// Default number of search results.
        #[arg(long, default_value_t = 10)]
        search_limit: usize,

        /// Print scores in search output.
        #[arg(long)]
        show_score: bool,

        /// Fuzzy matching: 0 = exact, 1-2 = prefix expansion.
        #[arg(long, default_value_t = 0)]
        fuzziness: u8,

        /// Preview highlight style: ansi or html.
        #[arg(long, default_value = "ansi")]
        highlight: String,

        #[command(subcommand)]
        action: KwbAction,
    },
}

#[derive(Subcommand)]
enum AgentenvAction {
    /// Extract the default template tree to `<output>/.agentenv/`.
    Init {
        /// Project root.
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Run an agent CLI over the project and save `analysis.gen.md`.
    Analyse {
        /// Project root.
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// Analysis tool: claude, gemini, or codex.
        #[arg(long, default_value = "claude")]
        provider: String,

        /// Model override for the analysis tool.
        #[arg(long, default_value = "")]
        model: String,

        /// Analysis timeout in seconds.
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
    /// Render per-provider instruction files and JSON sidecars.
    Generate {
        /// Project root (config is read from `<output>/.agentenv/agentenv.yaml`).
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum KwbAction {
    /// Build (or rebuild) the index from the root directory.
    Build,
    /// Search the index.
    Search {
        /// The query string (phrases, AND/OR/NOT, and column:term work).
        query: String,

        /// Maximum results; defaults to --search-limit.
        #[arg(long, default_value_t = 0)]
        limit: i64,
    },
    /// Show document count and index location.
    Stats,
    /// Serve the knowledge base over MCP stdio.
    Serve,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Commit {
            providers,
            timeout,
            prompt,
            first,
            auto,
            dry_run,
            exclude_patterns,
            include_patterns,
            modules,
            multi_line,
            push,
            tag,
            use_global_gitignore,
        } => {
            let settings = commit::Settings {
                providers,
                timeout: Duration::from_secs(timeout),
                custom_prompt: prompt,
                first,
                auto,
                dry_run,
                exclude_patterns,
                include_patterns,
                modules,
                multi_line,
                push,
                tag,
                use_global_gitignore,
            };
            let mut service = commit::Service::new(settings, std::path::Path::new("."))?;
            service.execute().await?;
        }

        Commands::Agentenv { action } => match action {
            AgentenvAction::Init { output } => {
                let service = agentenv::Service::new(agentenv::Settings {
                    output_path: output,
                    analysis_provider: String::new(),
                    analysis_model: String::new(),
                    analysis_timeout: Duration::from_secs(300),
                });
                service.init()?;
                println!("agentenv initialized.");
            }
            AgentenvAction::Analyse {
                output,
                provider,
                model,
                timeout,
            } => {
                let service = agentenv::Service::new(agentenv::Settings {
                    output_path: output,
                    analysis_provider: provider,
                    analysis_model: model,
                    analysis_timeout: Duration::from_secs(timeout),
                });
                service.analyse().await?;
                println!("analysis completed.");
            }
            AgentenvAction::Generate { output } => {
                let service = agentenv::Service::new(agentenv::Settings {
                    output_path: output,
                    analysis_provider: String::new(),
                    analysis_model: String::new(),
                    analysis_timeout: Duration::from_secs(300),
                });
                service.generate()?;
                println!("generation completed.");
            }
        },

        Commands::Kwb {
            root,
            index,
            extra_extensions,
            exclude_dirs,
            max_file_size,
            batch_size,
            index_type,
            search_timeout,
            search_limit,
            show_score,
            fuzziness,
            highlight,
            action,
        } => {
            let settings = kwb::Settings {
                root_path: root.clone(),
                index_path: index,
                extra_extensions,
                exclude_dirs,
                max_file_size,
                batch_size,
                index_type,
                search_timeout: Duration::from_secs(search_timeout),
                search_limit,
                search_show_score: show_score,
                search_fuzziness: fuzziness,
                highlight_style: highlight,
            };
            if matches!(action, KwbAction::Serve) {
                kwb::server::serve(kwb::Service::new(settings)?).await?;
                return Ok(());
            }

            let mut service = kwb::Service::new(settings)?;
            let result = run_kwb(&mut service, &root, action).await;
            service.close().await;
            result?;
        }
    }

    Ok(())
}

async fn run_kwb(
    service: &mut kwb::Service,
    root: &std::path::Path,
    action: KwbAction,
) -> anyhow::Result<()> {
    match action {
        KwbAction::Build => {
            let count = service.build_index(root).await?;
            println!("Indexed {} documents.", count);
        }
        KwbAction::Search { query, limit } => {
            let results = service.search(&query, limit).await?;
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (i, result) in results.iter().enumerate() {
                if service.show_score() {
                    println!(
                        "{}. [{:.2}] {} ({})",
                        i + 1,
                        result.score,
                        result.path,
                        result.doc_type
                    );
                } else {
                    println!("{}. {} ({})", i + 1, result.path, result.doc_type);
                }
                if !result.preview.is_empty() {
                    println!("    {}", result.preview);
                }
            }
        }
        KwbAction::Stats => {
            let (count, path) = service.get_stats().await?;
            println!("documents: {}", count);
            println!("index: {}", path);
        }
        KwbAction::Serve => unreachable!("serve is handled before service setup"),
    }
    Ok(())
}
