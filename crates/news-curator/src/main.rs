use anyhow::{Context, Result};
use clap::Parser;
use curation::dates::short_date;
use curation::{
    list_runs, save_run, Collector, Config, CurationPolicy, GoogleNewsCollector, JsonFileCollector,
    OpenAiOracle, Pipeline, PipelineState,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "news-curator")]
#[command(about = "Collect, triage, de-duplicate and rank company news for client briefings")]
struct Args {
    /// Companies to curate (defaults to every active category)
    companies: Vec<String>,

    /// Curate every company of a category (e.g. Anchor, Growth, Whitespace)
    #[arg(short, long)]
    category: Option<String>,

    /// Read articles from a JSON file instead of Google News
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Maximum articles collected per company
    #[arg(long, default_value = "50")]
    max_results: usize,

    /// Maximum number of articles in the final selection
    #[arg(long)]
    cap: Option<usize>,

    /// JSON file overriding the built-in curation policy
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Oracle model (overrides OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Companies processed at the same time
    #[arg(long, default_value = "2")]
    concurrency: usize,

    /// Also trust the trade-press outlets
    #[arg(long)]
    include_additional_press: bool,

    /// Save each finished run as JSON
    #[arg(long)]
    save: bool,

    /// Print the prompts and raw oracle responses
    #[arg(long)]
    show_prompts: bool,

    /// List saved runs and exit
    #[arg(long)]
    list_runs: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_saved_runs() -> Result<()> {
    let runs = list_runs().context("Failed to list saved runs")?;
    if runs.is_empty() {
        println!("No saved runs.");
        return Ok(());
    }

    println!("📂 Saved runs ({}):", runs.len());
    for (path, record) in runs {
        println!(
            "  {}  {:<10} {} selected  {}",
            record.created_at,
            record.state.keyword,
            record.state.final_selection.len(),
            path.display()
        );
    }
    Ok(())
}

fn load_policy(args: &Args) -> Result<CurationPolicy> {
    let mut policy = match &args.policy {
        Some(path) => CurationPolicy::load(path)?,
        None => CurationPolicy::default(),
    };
    if let Some(cap) = args.cap {
        if cap == 0 {
            anyhow::bail!("--cap must be at least 1");
        }
        policy = policy.with_selection_cap(cap);
    }
    if args.include_additional_press {
        policy = policy.with_additional_press();
    }
    Ok(policy)
}

fn resolve_companies(args: &Args, policy: &CurationPolicy) -> Result<Vec<String>> {
    if let Some(category) = &args.category {
        let mut companies = policy.companies_in(category).ok_or_else(|| {
            let known: Vec<&str> = policy
                .categories
                .iter()
                .filter(|c| c.active)
                .map(|c| c.name.as_str())
                .collect();
            anyhow::anyhow!(
                "Unknown or inactive category: {}. Use one of: {}",
                category,
                known.join(", ")
            )
        })?;
        for company in &args.companies {
            if !companies.contains(company) {
                companies.push(company.clone());
            }
        }
        return Ok(companies);
    }

    if args.companies.is_empty() {
        Ok(policy.active_companies())
    } else {
        Ok(args.companies.clone())
    }
}

fn print_summary(state: &PipelineState, show_prompts: bool) {
    println!("\n════════ {} ════════", state.keyword);
    println!(
        "✓ Collected {} articles, {} from trusted outlets",
        state.collected.len(),
        state.working.len()
    );

    if state.working.is_empty() {
        println!("  No articles from trusted outlets.");
        return;
    }

    println!(
        "✓ Triage: {} excluded, {} borderline, {} retained",
        state.excluded.len(),
        state.borderline.len(),
        state.retained.len()
    );
    for judged in &state.excluded {
        println!("  ✗ [{}] {} ({}): {}", judged.index, judged.title, judged.press, judged.reason);
    }
    for judged in &state.borderline {
        println!("  ? [{}] {} ({}): {}", judged.index, judged.title, judged.press, judged.reason);
    }

    println!("✓ Grouped into {} stories", state.grouped.len());
    for group in state.grouped.iter().filter(|g| g.indices.len() > 1) {
        let members: Vec<String> = group.indices.iter().map(|i| i.to_string()).collect();
        println!(
            "  [{}] → {} ({})",
            members.join(", "),
            group.selected_index,
            group.reason
        );
    }

    println!("\n📰 Final selection ({}):", state.final_selection.len());
    for (n, item) in state.final_selection.iter().enumerate() {
        println!(
            "  {}. [{}] {} ({}, {})",
            n + 1,
            item.importance,
            item.title,
            item.press,
            short_date(&item.date)
        );
        println!("     {}", item.url);
        if !item.reason.is_empty() {
            println!("     {}", item.reason);
        }
        if !item.keywords.is_empty() {
            println!("     Keywords: {}", item.keywords.join(", "));
        }
        if !item.affiliates.is_empty() {
            println!("     Affiliates: {}", item.affiliates.join(", "));
        }
    }

    if !state.not_selected.is_empty() {
        println!("\nNot selected:");
        for item in &state.not_selected {
            let importance = item
                .importance
                .map(|i| i.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  · [{}] {} ({}): {}", item.index, item.title, importance, item.reason);
        }
    }

    if !state.diagnostics.is_empty() {
        println!("\n⚠ {} degradations:", state.diagnostics.len());
        for diagnostic in &state.diagnostics {
            println!("  {} {:?}: {}", diagnostic.stage, diagnostic.kind, diagnostic.detail);
        }
    }

    if show_prompts {
        for exchange in &state.exchanges {
            println!("\n──── {} prompt ────", exchange.stage);
            println!("[system]\n{}", exchange.system_prompt);
            println!("[user]\n{}", exchange.user_prompt);
            match (&exchange.response, &exchange.error) {
                (Some(response), _) => println!("[response]\n{}", response),
                (None, Some(error)) => println!("[error] {}", error),
                (None, None) => {}
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if args.list_runs {
        return print_saved_runs();
    }

    let policy = Arc::new(load_policy(&args)?);
    let companies = resolve_companies(&args, &policy)?;
    if companies.is_empty() {
        anyhow::bail!("No companies to curate. Name some, or activate a category in the policy.");
    }

    let mut config = Config::from_env()?;
    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }
    let oracle = OpenAiOracle::new(&config)?;
    println!("✓ Using {} for {} companies", oracle.model(), companies.len());

    let collector: Box<dyn Collector> = match &args.input {
        Some(path) => {
            println!("📂 Reading articles from {}", path.display());
            Box::new(JsonFileCollector::new(path))
        }
        None => {
            println!("🌐 Collecting from Google News...");
            Box::new(GoogleNewsCollector::new(policy.clone())?)
        }
    };

    let pipeline = Pipeline::new(Arc::new(oracle), policy);

    println!("🤖 Curating (up to {} at a time)...", args.concurrency.max(1));
    let results = tokio::select! {
        results = pipeline.run_many(collector.as_ref(), &companies, args.max_results, args.concurrency) => results,
        _ = tokio::signal::ctrl_c() => {
            println!("\n⚠ Interrupted. Nothing was saved.");
            return Ok(());
        }
    };

    let mut failed = 0;
    for (company, result) in results {
        match result {
            Ok(state) => {
                print_summary(&state, args.show_prompts);
                if args.save {
                    let path = save_run(&state)
                        .with_context(|| format!("Failed to save run for {}", company))?;
                    println!("\n✅ Saved to: {}", path.display());
                }
            }
            Err(e) => {
                failed += 1;
                println!("\n✗ {}: {:#}", company, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} runs failed", failed, companies.len());
    }

    Ok(())
}
