use stakefuse::cli::{Cli, Commands, ConfigAction, ProfileArgs};
use stakefuse::config::{Config, ConfigValidator};
use stakefuse::embedding;
use stakefuse::enhancer::EnhanceOptions;
use stakefuse::error::{Result, StakefuseError};
use stakefuse::profile::StakeholderProfile;
use stakefuse::retrieval::{
    AdapterHandle, AdaptiveController, FusionResult, InMemoryAdapter, PassageRef, SearchRequest,
};
use stakefuse::sizing::{BackendKind, DynamicKSizer};
use stakefuse::sparse::{AnalyzerHandle, SparseVectorEncoder};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::K {
            profile,
            corpus,
            memory_constrained,
            json,
        } => {
            cmd_k(cli.config, profile, corpus, memory_constrained, json)?;
        }
        Commands::Expand {
            profile,
            max_queries,
            no_alternate,
            no_synonyms,
            no_role_terms,
            json,
        } => {
            let overrides = ExpandOverrides {
                max_queries,
                no_alternate,
                no_synonyms,
                no_role_terms,
            };
            cmd_expand(cli.config, profile, overrides, json)?;
        }
        Commands::Encode { text, json } => {
            cmd_encode(cli.config, &text, json).await?;
        }
        Commands::Search {
            profile,
            passages,
            collection,
            memory_constrained,
            preview,
            json,
        } => {
            let backend = backend_kind(memory_constrained);
            cmd_search(
                cli.config, profile, &passages, &collection, backend, preview, json,
            )
            .await?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "stakefuse=debug" } else { "stakefuse=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn backend_kind(memory_constrained: bool) -> BackendKind {
    if memory_constrained {
        BackendKind::MemoryConstrained
    } else {
        BackendKind::Standard
    }
}

fn to_profile(args: ProfileArgs) -> StakeholderProfile {
    StakeholderProfile::new(args.id, args.role, args.concerns)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StakefuseError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn cmd_k(
    config_path: Option<PathBuf>,
    profile: ProfileArgs,
    corpus: usize,
    memory_constrained: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let sizer = DynamicKSizer::new(Arc::new(config.strategy_table()), config.sizing.clone());
    let plan = sizer.plan(corpus, &to_profile(profile), backend_kind(memory_constrained));

    if json {
        return print_json(&plan);
    }

    println!("Sizing");
    println!("======");
    println!(
        "  Category:  {}{}",
        plan.category.as_str(),
        if plan.known_stakeholder { "" } else { " (classified from role)" }
    );
    println!(
        "  Preset:    ratio {} / min {} / max {} (effective max {})",
        plan.sizing.ratio, plan.sizing.min_k, plan.sizing.max_k, plan.effective_max_k
    );
    println!("  Corpus:    {}", plan.corpus_size);
    println!("  Target:    {}", plan.target);
    println!("  K:         {}", plan.k);
    println!("  Request K: {}", plan.request_k);

    Ok(())
}

struct ExpandOverrides {
    max_queries: Option<usize>,
    no_alternate: bool,
    no_synonyms: bool,
    no_role_terms: bool,
}

fn cmd_expand(
    config_path: Option<PathBuf>,
    profile: ProfileArgs,
    overrides: ExpandOverrides,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let controller = AdaptiveController::from_config(&config);
    let defaults = EnhanceOptions::from(&config.enhancement);

    let mut request = SearchRequest::new(to_profile(profile), 0);
    request.max_queries = Some(overrides.max_queries.unwrap_or(defaults.max_queries));
    request.include_alternate_language =
        Some(defaults.include_alternate_language && !overrides.no_alternate);
    request.include_synonyms = Some(defaults.include_synonyms && !overrides.no_synonyms);
    request.include_role_specific_terms =
        Some(defaults.include_role_specific_terms && !overrides.no_role_terms);

    let queries = controller.weighted_queries(&request);

    if json {
        return print_json(&queries);
    }

    println!("Queries ({})", queries.len());
    for (i, query) in queries.iter().enumerate() {
        println!("  {}. [{:.3}] {}", i + 1, query.weight, query.text);
    }

    Ok(())
}

async fn cmd_encode(config_path: Option<PathBuf>, text: &str, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let analyzer = Arc::new(AnalyzerHandle::from_config(&config.sparse));
    let encoder = SparseVectorEncoder::new(config.sparse.clone(), analyzer)?;
    let outcome = encoder.encode(text).await;

    if json {
        return print_json(&outcome.vector);
    }

    println!(
        "Sparse vector: {} buckets{}",
        outcome.vector.len(),
        if outcome.degraded { " (degraded: no morphological analysis)" } else { "" }
    );
    for (index, value) in outcome.vector.iter() {
        println!("  {:>8}  {:.4}", index, value);
    }

    Ok(())
}

async fn cmd_search(
    config_path: Option<PathBuf>,
    profile: ProfileArgs,
    passages_path: &Path,
    collection: &str,
    backend: BackendKind,
    preview: usize,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let passages = read_passages(passages_path)?;

    let embedder = embedding::provider_from_config(&config.embedding)?;
    let adapter = InMemoryAdapter::with_config(
        collection,
        embedder,
        &config.indexing,
        config.embedding.batch_size,
    )?;
    adapter.add_passages(passages).await?;

    let handle = AdapterHandle::new(Arc::new(adapter));
    let controller = AdaptiveController::from_config(&config);
    let result = controller
        .search_collection(&to_profile(profile), collection, backend, &handle)
        .await?;

    if json {
        return print_json(&result);
    }

    print_result(&result, preview);
    Ok(())
}

fn read_passages(path: &Path) -> Result<Vec<PassageRef>> {
    let content = std::fs::read_to_string(path).map_err(|e| StakefuseError::Io {
        source: e,
        context: format!("Failed to read passages file: {:?}", path),
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| StakefuseError::Json {
                source: e,
                context: format!("Invalid passage on line {}", i + 1),
            })
        })
        .collect()
}

fn print_result(result: &FusionResult, preview: usize) {
    let stats = &result.statistics;

    println!("Queries");
    for query in &result.queries {
        println!("  [{:.3}] {}", query.weight, query.text);
    }

    println!("\nResults ({} of target {})", result.passages.len(), stats.target_k);
    for (i, passage) in result.passages.iter().enumerate() {
        let text: String = passage.text.chars().take(preview).collect();
        println!(
            "  {:>3}. {:.5}  x{}  {}  {}",
            i + 1,
            passage.rrf_score,
            passage.query_coverage,
            passage.id,
            text.replace('\n', " ")
        );
    }

    println!("\nStatistics");
    println!("  Phases:            {}", stats.phases_run);
    println!("  Achievement:       {:.2}", stats.achievement_rate);
    println!("  Unique seen:       {}", stats.total_unique);
    println!(
        "  Queries:           {} issued, {} failed",
        stats.queries_issued, stats.queries_failed
    );
    println!("  Hybrid fallbacks:  {}", stats.hybrid_fallbacks);
    if stats.timed_out {
        println!("  ⚠ Deadline reached, results are partial");
    }
    if stats.all_queries_failed {
        println!("  ⚠ All queries failed");
    }
    for (source, count) in &stats.source_counts {
        println!("  {:<30} {}", source, count);
    }
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            ConfigValidator::validate(&config)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    Config::load_or_default(config_path.as_deref())
}
