use crate::error::CliError;
use crate::{Cli, Command, MappingCommand, PairArgs, WindowArgs};
use gf_client::{FeedClient, ProxyImageFetcher};
use gf_core::config::EngineConfig;
use gf_core::id::LayerId;
use gf_core::mapping::{FieldToLayer, Mapping, MappingRow, PairKind, Window, rows_to_pairs};
use gf_core::model::Document;
use gf_core::normalize::{field_catalog, flatten, looks_like_image_url, normalize_all};
use gf_core::shorthand::{PairShorthand, parse_pair};
use gf_engine::host::DocumentHost;
use gf_engine::lint::{LintSeverity, lint_pairs};
use gf_engine::memory::{FileStorage, MemoryHost};
use gf_engine::populate::{BatchReport, Populator};
use gf_engine::resolver::{describe, introspect_selection};
use gf_engine::store::MappingStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Fetch {
            brand,
            size,
            scroll_id,
            raw,
            fields,
        } => {
            let output = if raw {
                FeedOutput::Raw
            } else if fields {
                FeedOutput::Fields
            } else {
                FeedOutput::Items
            };
            fetch(&config, &brand, size, scroll_id.as_deref(), output).await
        }
        Command::Introspect { doc, select } => introspect(&doc, &select),
        Command::Check { doc, pairs, items } => check(&doc, &pairs, items.as_deref()),
        Command::Apply {
            doc,
            items,
            pairs,
            window,
            out,
        } => apply(&config, &doc, &items, &pairs, window, out.as_deref()).await,
        Command::Populate {
            doc,
            items,
            brand,
            store,
            window,
            out,
        } => {
            let mapping = match store {
                Some(path) => load_mapping(&config, &path, &brand).await?,
                None => Mapping::default(),
            };
            populate(&config, &doc, &items, &mapping, window, out.as_deref()).await
        }
        Command::Mapping(cmd) => mapping(&config, cmd).await,
    }
}

// ─── Commands ────────────────────────────────────────────────────────────

enum FeedOutput {
    Items,
    Raw,
    Fields,
}

async fn fetch(
    config: &EngineConfig,
    brand: &str,
    size: Option<u32>,
    scroll_id: Option<&str>,
    output: FeedOutput,
) -> Result<ExitCode, CliError> {
    let client = FeedClient::new(reqwest::Client::new(), config);
    let page = client.fetch_page(brand, size, scroll_id).await?;
    if let Some(next) = &page.scroll_id {
        log::info!("next page: --scroll-id {next}");
    }

    match output {
        FeedOutput::Items => print_json(&normalize_all(&page.hits, brand))?,
        FeedOutput::Raw => {
            let flat = page
                .hits
                .iter()
                .map(|hit| serde_json::to_value(hit).map(|v| flat_object(&v)))
                .collect::<Result<Vec<_>, _>>()?;
            for (hit, record) in page.hits.iter().zip(&flat) {
                log::debug!("{}: image fields {:?}", hit.id, image_keys(record));
            }
            print_json(&flat)?;
        }
        FeedOutput::Fields => {
            let items = normalize_all(&page.hits, brand);
            let catalog = items.first().map(field_catalog).unwrap_or_default();
            print_json(&catalog)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn introspect(doc: &Path, select: &[String]) -> Result<ExitCode, CliError> {
    let mut host = MemoryHost::new(read_document(doc)?);
    if !select.is_empty() {
        let ids = select
            .iter()
            .map(|s| LayerId::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        host.doc.select(&ids);
    }
    print_json(&introspect_selection(&host))?;
    Ok(ExitCode::SUCCESS)
}

fn check(doc: &Path, pairs: &PairArgs, items: Option<&Path>) -> Result<ExitCode, CliError> {
    let host = MemoryHost::new(read_document(doc)?);
    let pairs = resolve_pairs(&host, pairs)?;
    let sample = match items {
        Some(path) => read_json::<Vec<Value>>(path)?.into_iter().next(),
        None => None,
    };

    let diags = lint_pairs(&host, &pairs, sample.as_ref());
    print_json(&diags)?;
    let warnings = diags
        .iter()
        .filter(|d| d.severity == LintSeverity::Warning)
        .count();
    log::info!(
        "{} pairs checked: {warnings} warnings, {} notes",
        pairs.len(),
        diags.len() - warnings
    );
    Ok(if warnings == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn apply(
    config: &EngineConfig,
    doc: &Path,
    items: &Path,
    pairs: &PairArgs,
    window: WindowArgs,
    out: Option<&Path>,
) -> Result<ExitCode, CliError> {
    let mut host = MemoryHost::new(read_document(doc)?);
    let items: Vec<Value> = read_json(items)?;
    let pairs = resolve_pairs(&host, pairs)?;
    let images = ProxyImageFetcher::new(reqwest::Client::new(), config);

    let report = Populator::new(&mut host, &images, config)
        .apply_pairs(&items, &pairs, window.into())
        .await;
    finish(&host, &report, out)
}

async fn populate(
    config: &EngineConfig,
    doc: &Path,
    items: &Path,
    mapping: &Mapping,
    window: WindowArgs,
    out: Option<&Path>,
) -> Result<ExitCode, CliError> {
    let mut host = MemoryHost::new(read_document(doc)?);
    let items: Vec<Value> = read_json(items)?;
    let images = ProxyImageFetcher::new(reqwest::Client::new(), config);

    let report = Populator::new(&mut host, &images, config)
        .populate_cards(&items, Some(mapping), window.into())
        .await;
    finish(&host, &report, out)
}

async fn mapping(config: &EngineConfig, cmd: MappingCommand) -> Result<ExitCode, CliError> {
    match cmd {
        MappingCommand::Save {
            brand,
            store,
            title,
            meta,
            poster,
        } => {
            let defaults = Mapping::default();
            let mapping = Mapping {
                title_node: title.unwrap_or(defaults.title_node),
                meta_node: meta.unwrap_or(defaults.meta_node),
                poster_node: poster.unwrap_or(defaults.poster_node),
            };
            let mut store = MappingStore::new(FileStorage::open(&store)?, &config.storage_namespace);
            store.save(&brand, &mapping).await?;
            log::info!("mapping saved for {}", brand.to_uppercase());
        }
        MappingCommand::Load { brand, store } => {
            print_json(&load_mapping(config, &store, &brand).await?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ─── Helpers ─────────────────────────────────────────────────────────────

impl From<WindowArgs> for Window {
    fn from(args: WindowArgs) -> Self {
        Window::new(args.offset, args.count)
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&read_text(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

async fn load_mapping(
    config: &EngineConfig,
    path: &Path,
    brand: &str,
) -> Result<Mapping, CliError> {
    let store = MappingStore::new(FileStorage::open(path)?, &config.storage_namespace);
    Ok(store.load_or_default(brand).await?)
}

/// Pairs from a rows file or from inline shorthand.
fn resolve_pairs(host: &dyn DocumentHost, args: &PairArgs) -> Result<Vec<FieldToLayer>, CliError> {
    if let Some(path) = &args.pairs {
        let rows: Vec<MappingRow> = read_json(path)?;
        let pairs = rows_to_pairs(&rows);
        if pairs.len() < rows.len() {
            log::warn!("ignored {} incomplete rows", rows.len() - pairs.len());
        }
        return Ok(pairs);
    }
    args.pair
        .iter()
        .map(|text| Ok(complete_pair(host, parse_pair(text)?)))
        .collect()
}

/// Fill in an omitted kind from the target layer. Unknown targets default
/// to text so the run reports them instead of refusing to start.
fn complete_pair(host: &dyn DocumentHost, shorthand: PairShorthand) -> FieldToLayer {
    let kind = shorthand.kind.unwrap_or_else(|| {
        describe(host, shorthand.layer_id)
            .and_then(|info| info.preferred_kind())
            .unwrap_or_else(|| {
                log::warn!("cannot infer a kind for {}; using text", shorthand.layer_id);
                PairKind::Text
            })
    });
    FieldToLayer {
        layer_id: shorthand.layer_id,
        kind,
        field: shorthand.field,
        transform: shorthand.transform,
    }
}

fn finish(host: &MemoryHost, report: &BatchReport, out: Option<&Path>) -> Result<ExitCode, CliError> {
    print_json(report)?;
    if report.rejected {
        for warning in &report.warnings {
            log::warn!("{warning}");
        }
        return Ok(ExitCode::FAILURE);
    }
    if let Some(out) = out {
        let text = host.doc.to_json_pretty()?;
        std::fs::write(out, text).map_err(|source| CliError::Io {
            path: out.to_path_buf(),
            source,
        })?;
        log::info!("wrote {}", out.display());
    }
    Ok(if report.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn flat_object(value: &Value) -> Value {
    Value::Object(flatten(value).into_iter().collect::<Map<_, _>>())
}

/// Keys of a flattened record whose values look like image links.
fn image_keys(record: &Value) -> Vec<&str> {
    record
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(_, v)| looks_like_image_url(v))
                .map(|(k, _)| k.as_str())
                .collect()
        })
        .unwrap_or_default()
}

fn read_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    serde_json::from_str(&read_text(path)?).map_err(|source| CliError::Json {
        path: PathBuf::from(path),
        source,
    })
}

fn read_document(path: &Path) -> Result<Document, CliError> {
    Ok(Document::from_json(&read_text(path)?)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
