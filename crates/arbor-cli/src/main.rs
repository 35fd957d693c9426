//! Arbor CLI - self-organizing hierarchical knowledge base

use std::sync::Arc;

use arbor_core::config::Config;
use arbor_core::domain::taxonomy::{
    LlmTopicClassifier, TaxonomyService, TopicRepository, TopicResolver, TopicTreeNode, TreeMode,
    slugify,
};
use arbor_core::infrastructure::taxonomy::SqliteTopicRepository;
use arbor_core::llm::LlmClient;
use arbor_core::storage::{Database, DatabaseConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(author, version, about = "Self-organizing hierarchical knowledge base", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum TreeModeArg {
    #[default]
    Full,
    Public,
}

impl From<TreeModeArg> for TreeMode {
    fn from(mode: TreeModeArg) -> Self {
        match mode {
            TreeModeArg::Full => TreeMode::Full,
            TreeModeArg::Public => TreeMode::PublicOnly,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a free-text query to a canonical topic slug
    Resolve {
        /// Free-text topic query
        query: String,
        /// Attribute created stubs to this user ID
        #[arg(long)]
        actor: Option<String>,
    },

    /// Generate a full topic (overview, chapters, links) and place it
    Generate {
        /// Topic title or query
        title: String,
        /// Attribute the generated topic to this user ID
        #[arg(long)]
        actor: Option<String>,
    },

    /// Print the topic hierarchy as a tree
    Tree {
        /// Which topics to include
        #[arg(long, value_enum, default_value_t = TreeModeArg::Full)]
        mode: TreeModeArg,
    },

    /// Inspect topics
    Topics {
        #[command(subcommand)]
        action: TopicAction,
    },

    /// Show hierarchy statistics
    Stats,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum TopicAction {
    /// List all topics
    List,
    /// Show topic details by slug or ID
    Show { slug: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("arbor=info".parse()?)
                .add_directive("arbor_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { query, actor } => {
            cmd_resolve(&query, actor.as_deref(), cli.format, cli.quiet).await
        }

        Commands::Generate { title, actor } => {
            cmd_generate(&title, actor.as_deref(), cli.format, cli.quiet).await
        }

        Commands::Tree { mode } => cmd_tree(mode.into(), cli.format).await,

        Commands::Topics { action } => cmd_topics(action, cli.format, cli.quiet).await,

        Commands::Stats => cmd_stats(cli.format).await,

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Doctor => cmd_doctor(cli.quiet).await,
    }
}

/// Open the configured database, creating it (and running migrations) on
/// first use.
async fn open_database() -> anyhow::Result<Database> {
    let config = Config::load()?;
    let path = config.database_path()?;
    let db = Database::new(DatabaseConfig::with_path(path)).await?;
    Ok(db)
}

fn open_repository(db: &Database) -> Arc<SqliteTopicRepository> {
    Arc::new(SqliteTopicRepository::new(db.pool().clone()))
}

/// Build the live LLM classifier. Fails early when no API key is
/// configured so write commands do not touch the store first.
fn build_classifier() -> anyhow::Result<Arc<LlmTopicClassifier>> {
    let config = Config::load()?;
    let api_key = config.llm.resolved_api_key()?.ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured. Set ARBOR_API_KEY or OPENROUTER_API_KEY."
        )
    })?;
    let client = LlmClient::new(config.llm.clone(), api_key)?;
    Ok(Arc::new(LlmTopicClassifier::new(Arc::new(client))))
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_resolve(
    query: &str,
    actor: Option<&str>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let db = open_database().await?;
    let repository = open_repository(&db);

    // Repeat queries hit the slug index directly; the classifier (and
    // with it the API key) is only needed on a miss
    let candidate = slugify(query.trim());
    if !candidate.is_empty() {
        if let Some(existing) = repository.get_by_slug(&candidate).await? {
            print_resolved(query, &existing.slug, format, quiet);
            return Ok(());
        }
    }

    let classifier = build_classifier()?;
    let resolver = TopicResolver::new(repository, classifier);

    let slug = resolver.resolve_topic(query, actor).await?;
    print_resolved(query, &slug, format, quiet);
    Ok(())
}

fn print_resolved(query: &str, slug: &str, format: OutputFormat, quiet: bool) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "slug": slug }));
        }
        OutputFormat::Text => {
            if quiet {
                println!("{}", slug);
            } else {
                println!("Resolved '{}' -> {}", query, slug);
            }
        }
    }
}

async fn cmd_generate(
    title: &str,
    actor: Option<&str>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let classifier = build_classifier()?;
    let db = open_database().await?;
    let service = TaxonomyService::new(open_repository(&db), classifier);

    if !quiet && format == OutputFormat::Text {
        println!("Generating topic '{}'...", title);
    }

    let outcome = service.generate_topic(title, actor).await?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "topic": outcome.topic,
                    "chapters": outcome.chapters,
                    "links_created": outcome.links_created,
                    "adopted": outcome.adopted,
                })
            );
        }
        OutputFormat::Text => {
            if quiet {
                println!("{}", outcome.topic.slug);
            } else {
                println!("Topic generated!");
                println!("  Slug: {}", outcome.topic.slug);
                println!("  Title: {}", outcome.topic.title);
                if let Some(parent_id) = &outcome.topic.parent_id {
                    println!("  Parent: {}", parent_id);
                }
                println!("  Chapters: {}", outcome.chapters.len());
                for chapter in &outcome.chapters {
                    println!("    {}. {}", chapter.order_index + 1, chapter.title);
                }
                println!("  Links created: {}", outcome.links_created);
                if outcome.adopted > 0 {
                    println!("  Orphans adopted: {}", outcome.adopted);
                }
            }
        }
    }
    Ok(())
}

async fn cmd_tree(mode: TreeMode, format: OutputFormat) -> anyhow::Result<()> {
    let db = open_database().await?;
    let repository = open_repository(&db);

    let topics = repository.list_topics().await?;
    let roots = arbor_core::domain::taxonomy::assemble(topics, mode);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&roots)?);
        }
        OutputFormat::Text => {
            if roots.is_empty() {
                println!("No topics found.");
                println!("\nGenerate one with: arbor generate <title>");
            } else {
                for root in &roots {
                    print_tree_node(root, 0);
                }
            }
        }
    }
    Ok(())
}

fn print_tree_node(node: &TopicTreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{}{} ({})", indent, node.title, node.slug);
    for child in &node.children {
        print_tree_node(child, depth + 1);
    }
}

async fn cmd_topics(action: TopicAction, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let db = open_database().await?;
    let repository = open_repository(&db);

    match action {
        TopicAction::List => {
            let topics = repository.list_topics().await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&topics)?);
                }
                OutputFormat::Text => {
                    if topics.is_empty() {
                        if !quiet {
                            println!("No topics found.");
                            println!("\nGenerate one with: arbor generate <title>");
                        }
                    } else {
                        if !quiet {
                            println!("Topics:");
                        }
                        for t in topics {
                            let marker = if t.is_placeholder() { " [category]" } else { "" };
                            println!("  {} - {}{}", t.slug, t.title, marker);
                        }
                    }
                }
            }
        }
        TopicAction::Show { slug } => {
            // Try slug first, then fall back to ID
            let found = if let Some(t) = repository.get_by_slug(&slug).await? {
                Some(t)
            } else {
                repository.get_topic(&slug).await?
            };

            let topic = found.ok_or_else(|| {
                anyhow::anyhow!(
                    "Topic '{}' not found. Run `arbor topics list` to see all topics.",
                    slug
                )
            })?;

            let chapters = repository.chapters_for(&topic.id).await?;
            let links = repository.links_for(&topic.id).await?;

            match format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "topic": topic,
                            "chapters": chapters,
                            "links": links,
                        })
                    );
                }
                OutputFormat::Text => {
                    println!("Topic: {}", topic.title);
                    println!("  ID: {}", topic.id);
                    println!("  Slug: {}", topic.slug);
                    if let Some(parent_id) = &topic.parent_id {
                        println!("  Parent: {}", parent_id);
                    }
                    if !topic.overview.is_empty() {
                        println!("  Overview: {}", topic.overview);
                    }
                    if !topic.tags.is_empty() {
                        println!("  Tags: {}", topic.tags.join(", "));
                    }
                    if let Some(creator) = &topic.creator_id {
                        println!("  Creator: {}", creator);
                    }
                    println!("  Created: {}", topic.created_at.format("%Y-%m-%d %H:%M:%S"));
                    println!("  Updated: {}", topic.updated_at.format("%Y-%m-%d %H:%M:%S"));

                    if !chapters.is_empty() {
                        println!("\nChapters:");
                        for chapter in &chapters {
                            println!("  {}. {}", chapter.order_index + 1, chapter.title);
                        }
                    }
                    if !links.is_empty() {
                        println!("\nLinks:");
                        for link in &links {
                            println!(
                                "  {} -> {} [{}]",
                                link.source_id, link.target_id, link.link_type
                            );
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

async fn cmd_stats(format: OutputFormat) -> anyhow::Result<()> {
    let db = open_database().await?;
    let repository = open_repository(&db);

    let stats = repository.stats().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Text => {
            println!("Hierarchy Statistics:");
            println!("  Topics: {}", stats.total_topics);
            println!("    Roots: {}", stats.root_topics);
            println!("    Categories: {}", stats.placeholder_topics);
            println!("    System-owned: {}", stats.system_topics);
            println!("  Chapters: {}", stats.total_chapters);
            println!("  Links: {}", stats.total_links);
            for (link_type, count) in &stats.links_by_type {
                println!("    {}: {}", link_type, count);
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Arbor Health Check");
        println!("==================");
        println!();
    }

    let mut all_ok = true;

    // Check configuration
    match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }

            // Check API key
            match config.llm.resolved_api_key() {
                Ok(Some(_)) => {
                    if !quiet {
                        let redacted = config.llm.redacted_api_key()?.unwrap_or_default();
                        println!("[OK] API Key: Configured ({})", redacted);
                    }
                }
                Ok(None) => {
                    all_ok = false;
                    if !quiet {
                        tracing::warn!("API key not configured");
                        println!("[!!] API Key: Not configured");
                        println!(
                            "     Set ARBOR_API_KEY or OPENROUTER_API_KEY environment variable"
                        );
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] API Key: Error - {}", e);
                    }
                }
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
        }
    }

    // Check config file location
    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }
    }

    // Check database
    match open_database().await {
        Ok(db) => match db.health_check().await {
            Ok(()) => {
                if !quiet {
                    println!("[OK] Database: Connected");
                    println!("     Path: {}", db.path().display());

                    match db.migration_status().await {
                        Ok(status) => {
                            if status.needs_migration {
                                println!(
                                    "[!!] Schema: v{} (v{} available)",
                                    status.current_version, status.target_version
                                );
                            } else {
                                println!("[OK] Schema: v{}", status.current_version);
                            }
                        }
                        Err(e) => {
                            println!("[!!] Schema: Error - {}", e);
                        }
                    }
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Database: Unhealthy - {}", e);
                }
            }
        },
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Error - {}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    if all_ok {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
