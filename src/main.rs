//! Formpilot - adaptive web form filling with replayable recipes.
//!
//! Main entry point for the Formpilot CLI.

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use formpilot_browser_cdp::CdpClient;
use formpilot_config::{Config, ConfigLoader, ConfigValidator, ProviderConfig};
use formpilot_engine::{
    AdaptiveRecorder, CostModel, FieldExtractor, FillOptions, FormDriver, GeneratorOptions,
    RecipeEngine, RecoveryAnalyzer, ResponseGenerator,
};
use formpilot_protocols::{AttemptRequest, JobContext, Profile, Recipe, RecipeStore};
use formpilot_provider_anthropic::AnthropicProvider;
use formpilot_store_sqlite::SqliteStore;

use cli::{Cli, Commands, RecipeAction};

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Apply {
            url,
            platform,
            profile,
            resume,
            job_title,
            company,
        } => run_apply(&config, url, platform, profile, resume, job_title, company).await,
        Commands::Recipe { action } => match action {
            RecipeAction::List => recipe_list(&config).await,
            RecipeAction::Show { platform_key } => recipe_show(&config, &platform_key).await,
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(p) => ConfigLoader::load(p)
            .with_context(|| format!("Loading config from {}", p.display()))?,
        None => {
            let default_path = dirs::home_dir()
                .map(|home| home.join(".formpilot").join("config.toml"));
            match default_path {
                Some(p) if p.exists() => ConfigLoader::load(&p)
                    .with_context(|| format!("Loading config from {}", p.display()))?,
                _ => Config::default(),
            }
        }
    };

    let result = ConfigValidator::validate(&config)?;
    for warning in &result.warnings {
        warn!("Config warning: {}", warning);
    }
    if !result.is_valid() {
        for error in &result.errors {
            eprintln!("Config error: {}", error);
        }
        bail!("Invalid configuration");
    }

    Ok(config)
}

fn provider_config<'a>(config: &'a Config) -> Result<&'a ProviderConfig> {
    let id = &config.generation.provider;
    if id != "anthropic" {
        bail!("Unknown generation provider '{}'", id);
    }
    config
        .providers
        .get(id)
        .ok_or_else(|| anyhow!("Missing [providers.{}] configuration section", id))
}

fn build_provider(config: &Config) -> Result<Arc<AnthropicProvider>> {
    let provider_cfg = provider_config(config)?;
    let api_key = provider_cfg
        .api_key
        .clone()
        .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
        .ok_or_else(|| {
            anyhow!("No API key: set providers.anthropic.api_key or ANTHROPIC_API_KEY")
        })?;
    let model = provider_cfg.model.as_deref().unwrap_or(DEFAULT_MODEL);

    let mut provider = AnthropicProvider::new(api_key, model);
    if let Some(base_url) = &provider_cfg.base_url {
        provider = provider.with_base_url(base_url);
    }
    Ok(Arc::new(provider))
}

async fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let path = &config.store.path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Creating {}", parent.display()))?;
    }
    let store = SqliteStore::open(path)
        .await
        .with_context(|| format!("Opening recipe store at {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn connect_browser(config: &Config) -> Result<CdpClient> {
    let timeout = Duration::from_secs(config.browser.connect_timeout_secs);
    tokio::time::timeout(timeout, CdpClient::connect(&config.browser.cdp_url))
        .await
        .map_err(|_| anyhow!("Browser connection timed out after {:?}", timeout))?
        .with_context(|| format!("Connecting to browser at {}", config.browser.cdp_url))
}

#[allow(clippy::too_many_arguments)]
async fn run_apply(
    config: &Config,
    url: String,
    platform: String,
    profile_path: PathBuf,
    resume: Option<PathBuf>,
    job_title: Option<String>,
    company: Option<String>,
) -> Result<()> {
    let profile_json = std::fs::read_to_string(&profile_path)
        .with_context(|| format!("Reading profile {}", profile_path.display()))?;
    let profile = Profile::new(
        serde_json::from_str(&profile_json)
            .with_context(|| format!("Parsing profile {}", profile_path.display()))?,
    );

    let resume_path = resume.or_else(|| profile.resume_path().map(PathBuf::from));

    let store = open_store(config).await?;
    let provider = build_provider(config)?;

    let generator = ResponseGenerator::new(
        provider.clone(),
        GeneratorOptions {
            max_tokens: config.generation.max_tokens,
            temperature: config.generation.temperature,
            timeout: Duration::from_secs(config.generation.timeout_secs),
        },
    );

    let pacing = (config.fill.pacing_max_ms > 0)
        .then_some((config.fill.pacing_min_ms, config.fill.pacing_max_ms));
    let driver = FormDriver::new(FillOptions {
        pacing_ms: pacing,
        resume_path,
    });

    let recovery = RecoveryAnalyzer::new(provider.clone(), store.clone())
        .with_timeout(Duration::from_secs(config.generation.vision_timeout_secs));

    let recorder = AdaptiveRecorder::new(generator, driver)
        .with_extractor(FieldExtractor::new())
        .with_recovery(recovery)
        .allow_unsolved_captcha(config.captcha.allow_unsolved)
        .with_success_threshold(config.fill.success_threshold)
        .with_recording_cost(config.cost.recording_cost);

    let engine = RecipeEngine::new(
        store,
        Arc::new(recorder),
        CostModel {
            replay_cost: config.cost.replay_cost,
            recording_cost: config.cost.recording_cost,
        },
    );

    let client = connect_browser(config).await?;
    let page = client.open_page().await.context("Attaching to a page tab")?;

    let mut request = AttemptRequest::new(url, platform, profile);
    if job_title.is_some() || company.is_some() {
        request = request.with_job(JobContext {
            title: job_title.unwrap_or_default(),
            company: company.unwrap_or_default(),
            description: String::new(),
        });
    }

    info!(platform_key = %request.platform_key, "Starting attempt");
    let outcome = engine.apply(&page, &request).await?;

    println!("Platform:  {}", outcome.platform_key);
    println!("Phase:     {:?}", outcome.phase);
    println!("Method:    {:?}", outcome.method);
    if let Some(version) = outcome.recipe_version {
        println!("Recipe:    v{}", version);
    }
    if let Some(report) = &outcome.report {
        println!(
            "Fields:    {} filled, {} failed",
            report.filled.len(),
            report.failures.len()
        );
        for failure in &report.failures {
            println!("  ! {}: {}", failure.field, failure.message);
        }
    }
    println!("Cost:      {:.2} units", outcome.costs.total());

    if !outcome.success {
        bail!(
            "Attempt failed: {}",
            outcome.error.as_deref().unwrap_or("see report above")
        );
    }
    println!("Result:    success");
    Ok(())
}

async fn recipe_list(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let recipes = store.list().await?;

    if recipes.is_empty() {
        println!("No recipes recorded yet.");
        return Ok(());
    }

    println!(
        "{:<30} {:<12} {:>4} {:>6} {:>9} {:>12}",
        "PLATFORM KEY", "ATS", "VER", "USED", "SUCCESS", "TOTAL SAVED"
    );
    for recipe in &recipes {
        println!(
            "{:<30} {:<12} {:>4} {:>6} {:>8.0}% {:>12.2}",
            recipe.platform_key,
            recipe.ats_type,
            recipe.version,
            recipe.times_used,
            recipe.success_rate * 100.0,
            recipe.total_saved,
        );
    }
    Ok(())
}

async fn recipe_show(config: &Config, platform_key: &str) -> Result<()> {
    let store = open_store(config).await?;
    let recipe: Recipe = store
        .get(platform_key)
        .await?
        .ok_or_else(|| anyhow!("No recipe for '{}'", platform_key))?;

    println!("Platform key:    {}", recipe.platform_key);
    println!("ATS type:        {}", recipe.ats_type);
    println!("Version:         {}", recipe.version);
    println!("Times used:      {}", recipe.times_used);
    println!("Failures:        {}", recipe.failure_count);
    println!("Success rate:    {:.0}%", recipe.success_rate * 100.0);
    println!("Total saved:     {:.2} units", recipe.total_saved);
    println!("Expected saving: {:.2} units", recipe.expected_saving());
    if let Some(last_used) = recipe.last_used {
        println!("Last used:       {}", last_used.to_rfc3339());
    }
    if let Some(last_failure) = recipe.last_failure {
        println!("Last failure:    {}", last_failure.to_rfc3339());
    }

    println!("\nSteps:");
    for (index, step) in recipe.steps.iter().enumerate() {
        let value = step.templated_value.as_deref().unwrap_or("-");
        println!(
            "  {:>2}. {:<9} {:<40} {}",
            index + 1,
            format!("{:?}", step.action),
            step.selector,
            value
        );
    }
    Ok(())
}
