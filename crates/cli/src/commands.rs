use anyhow::{bail, Context, Result};
use caixa_core::{Direction, LedgerEntry};
use caixa_import::{HttpSuggester, ImportSession, RuleClassifier, StagingId};
use caixa_storage::DbPool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub file: PathBuf,
    pub ai: bool,
    pub deselect: Vec<u64>,
    pub category: Option<String>,
    pub commit: bool,
    pub json: bool,
}

async fn open_db(config: &Config) -> Result<DbPool> {
    let path = config.database_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create data directory {}", parent.display()))?;
    }
    let db = caixa_storage::create_db(&path)
        .await
        .with_context(|| format!("open database {}", path.display()))?;
    caixa_storage::seed_defaults(&db).await?;
    Ok(db)
}

fn load_classifier(config: &Config) -> Result<RuleClassifier> {
    match &config.rules_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("read rule table {}", path.display()))?;
            let classifier = caixa_import::import::load_rule_table(&content)
                .with_context(|| format!("in {}", path.display()))?;
            tracing::info!(rules = classifier.rules().len(), "loaded rule table");
            Ok(classifier)
        }
        None => Ok(RuleClassifier::default()),
    }
}

fn build_suggester(config: &Config) -> Result<HttpSuggester> {
    let Some(endpoint) = &config.ai.endpoint else {
        bail!("AI classification needs `ai.endpoint` in caixa.toml or ${}", crate::config::AI_ENDPOINT_ENV);
    };
    let mut suggester = HttpSuggester::new(endpoint.clone(), config.ai.timeout())?;
    if let Some(key) = config.ai.api_key() {
        suggester = suggester.with_api_key(key);
    }
    if let Some(model) = &config.ai.model {
        suggester = suggester.with_model(model.clone());
    }
    Ok(suggester)
}

pub async fn init(config: &Config) -> Result<()> {
    let path = config.database_path();
    open_db(config).await?;
    println!("Database ready: {}", path.display());
    Ok(())
}

pub async fn import(config: &Config, opts: ImportOptions) -> Result<()> {
    let db = open_db(config).await?;
    let catalogue = caixa_storage::load_catalogue(&db).await?;
    let units = caixa_storage::load_units(&db).await?;
    let classifier = load_classifier(config)?;

    if let Some(name) = &opts.category {
        if !catalogue.combined().iter().any(|c| c == name) {
            bail!("Unknown category '{name}'");
        }
    }

    let data = tokio::fs::read(&opts.file)
        .await
        .with_context(|| format!("read {}", opts.file.display()))?;

    let mut session = caixa_import::import::import_ofx(&data, &classifier, catalogue, units);
    session.set_protect_manual_edits(config.protect_manual_edits);
    session.set_restrict_proposals(config.restrict_ai_to_catalogue);

    if session.is_empty() {
        println!("No transactions found in {}", opts.file.display());
        session.cancel();
        return Ok(());
    }

    if opts.ai {
        let suggester = Arc::new(build_suggester(config)?);
        eprintln!("Classifying {} description(s)...", session.distinct_descriptions().len());
        let pending = session.spawn_ai_classification(suggester);
        let result = pending.await_result().await;
        match session.apply_ai_result(result) {
            Ok(changed) => eprintln!("AI classification updated {changed} item(s)"),
            Err(e) => eprintln!("AI classification unavailable, keeping rule categories: {e}"),
        }
    }

    for id in &opts.deselect {
        session.set_selected(StagingId(*id), false);
    }
    if let Some(name) = &opts.category {
        let changed = session.bulk_apply_category(name);
        eprintln!("Set '{name}' on {changed} selected item(s)");
    }

    print_staging(&session, opts.json)?;

    if opts.commit {
        let entries = session.commit();
        let stored = caixa_storage::insert_ledger_entries(&db, &entries).await?;
        println!("Committed {stored} entr{}", if stored == 1 { "y" } else { "ies" });
    } else {
        let selected = session.selected_count();
        session.cancel();
        println!("Dry run: {selected} selected item(s) not committed (use --commit)");
    }
    Ok(())
}

fn print_staging(session: &ImportSession, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(session.items())?);
        return Ok(());
    }

    println!(
        "{:>4}  {:<3} {:<10}  {:>12}  {:<22} {:<14} DESCRIPTION",
        "ID", "SEL", "DATE", "AMOUNT", "CATEGORY", "UNIT"
    );
    for item in session.items() {
        println!(
            "{:>4}  {:<3} {:<10}  {:>12}  {:<22} {:<14} {}",
            item.id(),
            if item.is_selected() { "[x]" } else { "[ ]" },
            item.date(),
            signed(item.direction(), &item.amount().to_string()),
            item.category(),
            item.unit().unwrap_or("-"),
            item.description()
        );
    }
    Ok(())
}

fn signed(direction: Direction, amount: &str) -> String {
    match direction {
        Direction::Inflow => amount.to_string(),
        Direction::Outflow => format!("-{amount}"),
    }
}

pub async fn entries(config: &Config, from: Option<String>, to: Option<String>, json: bool) -> Result<()> {
    let db = open_db(config).await?;
    let range = match (&from, &to) {
        (Some(f), Some(t)) => Some((f.as_str(), t.as_str())),
        (None, None) => None,
        _ => bail!("--from and --to must be given together"),
    };
    let entries = caixa_storage::get_ledger_entries(&db, range).await?;
    print_entries(&entries, json)
}

fn print_entries(entries: &[LedgerEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    for e in entries {
        println!(
            "{:<10}  {:>12}  {:<22} {:<14} {}",
            e.date,
            signed(e.direction, &e.amount.to_string()),
            e.category,
            e.unit.as_deref().unwrap_or("-"),
            e.description
        );
    }
    println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    Ok(())
}

pub async fn categories(config: &Config) -> Result<()> {
    let db = open_db(config).await?;
    let catalogue = caixa_storage::load_catalogue(&db).await?;
    let units = caixa_storage::load_units(&db).await?;

    for direction in [Direction::Inflow, Direction::Outflow] {
        println!("{direction}:");
        for name in catalogue.list(direction) {
            println!("  {name}");
        }
    }
    println!("units:");
    for (i, unit) in units.iter().enumerate() {
        println!("  {unit}{}", if i == 0 { " (default)" } else { "" });
    }
    Ok(())
}

pub async fn add_category(config: &Config, name: &str, direction: Direction) -> Result<()> {
    let db = open_db(config).await?;
    if caixa_storage::add_category(&db, name, direction).await? {
        println!("Added {direction} category '{name}'");
    } else {
        println!("Category '{name}' already exists");
    }
    Ok(())
}
