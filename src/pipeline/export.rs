//! Markdown vault -> remote identity store.

use serde::Serialize;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::app::ports::IdentityStorePort;
use crate::config::ExportConfig;
use crate::constants::{document_glob_prefix, DEFAULT_RECORD_TYPE, DOCUMENT_EXTENSION};
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::document::Document;
use crate::pipeline::import::skip_label;
use crate::pipeline::normalize::yaml::{non_empty_string, raw_number, scalar_string, to_json_map, ListSource};
use crate::pipeline::normalize::{
    coerce_positive, coerce_sitelinks, fame_tier, format_date, normalize_gender,
    normalize_relationships, parse_list, slug_from_fpid, RawDate,
};
use crate::types::{IdentityMeta, IdentityPayload, ParsedDocument, RelationshipRow, SkipReason};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStats {
    pub processed: usize,
    pub synced: usize,
    pub skipped: usize,
    pub errors: usize,
    pub relationship_errors: usize,
    pub batches: usize,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} synced, {} skipped, {} errors, {} relationship errors in {} batches",
            self.processed, self.synced, self.skipped, self.errors, self.relationship_errors, self.batches
        )
    }
}

/// Documents that made it through parsing, plus what was dropped on the way
#[derive(Debug, Default)]
pub struct ParseResults {
    pub documents: Vec<ParsedDocument>,
    pub processed: usize,
    pub skip_reasons: BTreeMap<SkipReason, usize>,
}

impl ParseResults {
    pub fn skipped(&self) -> usize {
        self.skip_reasons.values().sum()
    }

    fn skip(&mut self, reason: SkipReason) {
        *self.skip_reasons.entry(reason).or_insert(0) += 1;
        metrics::export::document_skipped(skip_label(reason));
    }
}

/// All `FP-*.md` files under `root`, sorted by path.
pub fn collect_documents(root: &Path) -> Vec<PathBuf> {
    let prefix = document_glob_prefix();
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable vault entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.starts_with(&prefix)
                && entry.path().extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Build the remote payload from document text. `Ok(None)` means the header
/// carries no usable `fpid`.
pub fn parse_document_text(text: &str) -> Result<Option<ParsedDocument>> {
    let doc = Document::parse(text)?;

    let fpid = match doc.get("fpid") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Ok(None),
    };

    let slug = non_empty_string(doc.get("slug")).unwrap_or_else(|| slug_from_fpid(&fpid));
    let birth_date = doc
        .get("birth_date")
        .and_then(scalar_string)
        .and_then(|raw| format_date(Some(RawDate::Text(&raw))));
    let gender = normalize_gender(doc.get("gender").and_then(scalar_string).as_deref());
    let country = ListSource::from_value(doc.get("country"));
    let occupation = ListSource::from_value(doc.get("occupation"));
    let sitelinks = coerce_sitelinks(doc.get("sitelinks").and_then(raw_number));

    let payload = IdentityPayload {
        slug,
        full_name: non_empty_string(doc.get("name")),
        record_type: non_empty_string(doc.get("type")).unwrap_or_else(|| DEFAULT_RECORD_TYPE.to_string()),
        net_worth: coerce_positive(doc.get("net_worth").and_then(raw_number)),
        height_cm: coerce_positive(doc.get("height_cm").and_then(raw_number)),
        birth_date,
        country: parse_list(country.as_raw()),
        gender,
        mbti: non_empty_string(doc.get("mbti")),
        zodiac: non_empty_string(doc.get("zodiac")),
        occupation: parse_list(occupation.as_raw()),
        image_url: non_empty_string(doc.get("image_url")),
        wikipedia_url: non_empty_string(doc.get("wikipedia_url")),
        bio_summary: non_empty_string(doc.get("ai_summary")).unwrap_or_default(),
        content_md: doc.body.trim().to_string(),
        social_links: to_json_map(doc.get("social")),
        meta: IdentityMeta {
            ids: to_json_map(doc.get("ids")),
        },
        sitelinks,
        fame_tier: fame_tier(sitelinks),
        data_sources: to_json_map(doc.get("data_sources")),
        fpid: fpid.clone(),
    };
    let relationships = normalize_relationships(&fpid, doc.get("relationships"));

    Ok(Some(ParsedDocument { payload, relationships }))
}

pub fn parse_document(path: &Path) -> Result<Option<ParsedDocument>> {
    let text = std::fs::read_to_string(path)?;
    parse_document_text(&text)
}

/// Parse every file on a pool of at most `max_workers` blocking tasks.
///
/// Output is ordered by path regardless of completion order. When two files
/// claim the same fpid, the first by path wins.
pub async fn parse_all(files: Vec<PathBuf>, max_workers: usize) -> ParseResults {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut set = JoinSet::new();

    for path in files {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        set.spawn_blocking(move || {
            let _permit = permit;
            let parsed = parse_document(&path);
            (path, parsed)
        });
    }

    let mut results = ParseResults::default();
    let mut parsed: Vec<(PathBuf, ParsedDocument)> = Vec::new();
    while let Some(joined) = set.join_next().await {
        results.processed += 1;
        match joined {
            Ok((path, Ok(Some(doc)))) => {
                debug!("Parsed {}", path.display());
                metrics::export::document_parsed();
                parsed.push((path, doc));
            }
            Ok((path, Ok(None))) => {
                warn!("No fpid in {}", path.display());
                results.skip(SkipReason::MissingFpid);
            }
            Ok((path, Err(e))) => {
                warn!("Parse error {}: {}", path.display(), e);
                results.skip(SkipReason::Unparseable);
            }
            Err(e) => {
                error!("Parse task failed: {}", e);
                results.skip(SkipReason::Unparseable);
            }
        }
    }

    parsed.sort_by(|a, b| a.0.cmp(&b.0));
    let mut seen = HashSet::new();
    for (path, doc) in parsed {
        if seen.insert(doc.payload.fpid.clone()) {
            results.documents.push(doc);
        } else {
            warn!("Duplicate fpid {} in {}", doc.payload.fpid, path.display());
            results.skip(SkipReason::DuplicateFpid);
        }
    }
    results
}

/// Submit documents in serial batches. A failed upsert fails only its own
/// batch; a failed relationship replace never un-syncs the identities.
pub async fn sync_batches(
    store: &dyn IdentityStorePort,
    documents: &[ParsedDocument],
    batch_size: usize,
) -> SyncStats {
    let mut stats = SyncStats::default();

    for (index, batch) in documents.chunks(batch_size.max(1)).enumerate() {
        stats.batches += 1;
        let started = Instant::now();
        let payloads: Vec<IdentityPayload> = batch.iter().map(|d| d.payload.clone()).collect();

        if let Err(e) = store.upsert_identities(&payloads).await {
            error!("Batch {} upsert failed ({} records): {}", index + 1, batch.len(), e);
            stats.errors += batch.len();
            metrics::export::batch_failed(batch.len(), started.elapsed().as_secs_f64());
            continue;
        }
        stats.synced += batch.len();
        metrics::export::batch_synced(batch.len(), started.elapsed().as_secs_f64());

        let sources: Vec<String> = payloads.into_iter().map(|p| p.fpid).collect();
        let rows: Vec<RelationshipRow> = batch
            .iter()
            .flat_map(|d| d.relationships.iter().cloned())
            .collect();
        match replace_relationships(store, &sources, &rows).await {
            Ok(()) => metrics::export::relationships_replaced(rows.len()),
            Err(e) => {
                warn!("Batch {} relationship sync error: {}", index + 1, e);
                stats.relationship_errors += 1;
                metrics::export::relationship_error();
            }
        }
        info!("Batch {}: {} records synced", index + 1, batch.len());
    }

    stats
}

async fn replace_relationships(
    store: &dyn IdentityStorePort,
    sources: &[String],
    rows: &[RelationshipRow],
) -> Result<()> {
    store.delete_relationships(sources).await?;
    if !rows.is_empty() {
        store.insert_relationships(rows).await?;
    }
    Ok(())
}

pub struct Exporter {
    store: Arc<dyn IdentityStorePort>,
    config: ExportConfig,
}

impl Exporter {
    pub fn new(store: Arc<dyn IdentityStorePort>, config: ExportConfig) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self), fields(vault = %self.config.vault_path.display()))]
    pub async fn run(&self) -> Result<SyncStats> {
        let vault = &self.config.vault_path;
        if !vault.is_dir() {
            return Err(PipelineError::MissingPath(format!(
                "Vault path not found: {}",
                vault.display()
            )));
        }

        let started = Instant::now();
        let files = collect_documents(vault);
        info!("Found {} files to sync", files.len());
        if files.is_empty() {
            warn!("No FP-*.md files found");
            return Ok(SyncStats::default());
        }

        let parsed = parse_all(files, self.config.max_workers).await;
        let mut stats =
            sync_batches(self.store.as_ref(), &parsed.documents, self.config.batch_size).await;
        stats.processed = parsed.processed;
        stats.skipped = parsed.skipped();

        metrics::export::duration(started.elapsed().as_secs_f64());
        info!("Complete: {}", stats);
        Ok(stats)
    }
}
