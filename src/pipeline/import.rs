//! CSV export -> Markdown vault.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ImportConfig;
use crate::constants::{DEFAULT_RECORD_TYPE, DEFAULT_STATUS, DOCUMENT_BODY, DOCUMENT_EXTENSION};
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::document;
use crate::pipeline::normalize::fields::is_null_sentinel;
use crate::pipeline::normalize::{
    coerce_positive, coerce_sitelinks, decade_bucket, derive_fpid, format_date, normalize_gender,
    parse_list, RawDate, RawList, RawNumber,
};
use crate::types::{ExternalIds, Fpid, PersonFrontmatter, SkipReason, SocialHandles};

/// One row of the Wikidata CSV export. Columns not listed here are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonRow {
    pub name: Option<String>,
    pub birth_year: Option<String>,
    pub birth_date: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub imdb_id: Option<String>,
    pub wikidata_id: Option<String>,
    pub sitelinks: Option<String>,
    pub net_worth: Option<String>,
    pub height_cm: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub image_url: Option<String>,
    pub wikipedia_url: Option<String>,
}

/// A row that produced an identifier, with its rendered header
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub fpid: Fpid,
    pub header: PersonFrontmatter,
}

impl PreparedDocument {
    /// `<decade>/<fpid>.md`, relative to the vault root
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&decade_bucket(&self.fpid.year))
            .join(format!("{}.{}", self.fpid.id, DOCUMENT_EXTENSION))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Created(PathBuf),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStats {
    pub rows: usize,
    pub created: usize,
    pub skipped: usize,
    pub malformed: usize,
    pub errors: usize,
    pub skip_reasons: BTreeMap<SkipReason, usize>,
}

impl ImportStats {
    fn record_skip(&mut self, reason: SkipReason) {
        self.skipped += 1;
        *self.skip_reasons.entry(reason).or_insert(0) += 1;
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !is_null_sentinel(v))
        .map(str::to_string)
}

/// Derive the identifier and canonical header for a row.
pub fn prepare_document(row: &PersonRow) -> std::result::Result<PreparedDocument, SkipReason> {
    let name = clean(&row.name).ok_or(SkipReason::MissingName)?;
    let fpid = derive_fpid(Some(&name), row.birth_year.as_deref()).ok_or(SkipReason::EmptySlug)?;

    let header = PersonFrontmatter {
        fpid: fpid.id.clone(),
        slug: fpid.slug.clone(),
        name,
        record_type: DEFAULT_RECORD_TYPE.to_string(),
        status: DEFAULT_STATUS.to_string(),
        net_worth: coerce_positive(row.net_worth.as_deref().map(RawNumber::Text)),
        height_cm: coerce_positive(row.height_cm.as_deref().map(RawNumber::Text)),
        birth_date: format_date(row.birth_date.as_deref().map(RawDate::Text)),
        country: parse_list(row.country.as_deref().map(RawList::Text)),
        gender: normalize_gender(row.gender.as_deref()),
        mbti: None,
        zodiac: None,
        occupation: parse_list(row.occupation.as_deref().map(RawList::Text)),
        social: SocialHandles {
            instagram: clean(&row.instagram),
            twitter: clean(&row.twitter),
        },
        ids: ExternalIds {
            imdb: clean(&row.imdb_id),
            wikidata: clean(&row.wikidata_id),
        },
        sitelinks: coerce_sitelinks(row.sitelinks.as_deref().map(RawNumber::Text)),
        image_url: clean(&row.image_url),
        wikipedia_url: clean(&row.wikipedia_url),
        relationships: Vec::new(),
        ai_summary: String::new(),
    };

    Ok(PreparedDocument { fpid, header })
}

pub struct Importer {
    output_dir: PathBuf,
    chunk_size: usize,
}

impl Importer {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// Import a CSV file. A missing file or a failing reader aborts the run;
    /// bad rows do not.
    #[instrument(skip(self), fields(output_dir = %self.output_dir.display()))]
    pub fn run(&self, csv_path: &Path) -> Result<ImportStats> {
        if !csv_path.exists() {
            return Err(PipelineError::MissingPath(format!("CSV not found: {}", csv_path.display())));
        }
        info!("Reading CSV: {}", csv_path.display());
        let file = fs::File::open(csv_path)?;
        self.import_reader(io::BufReader::new(file))
    }

    pub fn import_reader<R: Read>(&self, reader: R) -> Result<ImportStats> {
        let started = Instant::now();
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut stats = ImportStats::default();
        let mut chunk: Vec<PersonRow> = Vec::with_capacity(self.chunk_size);
        let mut chunk_index = 0usize;
        let mut record = csv::StringRecord::new();

        loop {
            match rdr.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    stats.rows += 1;
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    if record.len() > headers.len() {
                        warn!(
                            "Skipping malformed row at line {}: expected {} fields, saw {}",
                            line,
                            headers.len(),
                            record.len()
                        );
                        stats.malformed += 1;
                        metrics::import::row_malformed();
                        continue;
                    }
                    match record.deserialize::<PersonRow>(Some(&headers)) {
                        Ok(row) => chunk.push(row),
                        Err(e) => {
                            warn!("Skipping malformed row at line {}: {}", line, e);
                            stats.malformed += 1;
                            metrics::import::row_malformed();
                        }
                    }
                }
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    stats.rows += 1;
                    warn!("Skipping malformed row: {}", e);
                    stats.malformed += 1;
                    metrics::import::row_malformed();
                }
            }

            if chunk.len() >= self.chunk_size {
                chunk_index += 1;
                self.process_chunk(chunk_index, &chunk, &mut stats);
                chunk.clear();
            }
        }

        if !chunk.is_empty() {
            chunk_index += 1;
            self.process_chunk(chunk_index, &chunk, &mut stats);
        }

        metrics::import::rows_read(stats.rows);
        metrics::import::duration(started.elapsed().as_secs_f64());
        info!(
            "Import complete: {} created, {} skipped, {} malformed, {} errors",
            stats.created, stats.skipped, stats.malformed, stats.errors
        );
        Ok(stats)
    }

    fn process_chunk(&self, index: usize, rows: &[PersonRow], stats: &mut ImportStats) {
        for row in rows {
            match self.import_row(row) {
                Ok(RowOutcome::Created(path)) => {
                    debug!("Created {}", path.display());
                    stats.created += 1;
                    metrics::import::document_created();
                }
                Ok(RowOutcome::Skipped(reason)) => {
                    debug!("Skipped row: {}", reason);
                    stats.record_skip(reason);
                    metrics::import::row_skipped(skip_label(reason));
                }
                Err(e) => {
                    error!("Failed to write document: {}", e);
                    stats.errors += 1;
                    metrics::import::write_error();
                }
            }
        }
        info!(
            "Processed chunk {} ({} rows): {} created, {} skipped so far",
            index,
            rows.len(),
            stats.created,
            stats.skipped
        );
    }

    /// Write one row's document. Existing files are never overwritten.
    pub fn import_row(&self, row: &PersonRow) -> Result<RowOutcome> {
        let prepared = match prepare_document(row) {
            Ok(prepared) => prepared,
            Err(reason) => return Ok(RowOutcome::Skipped(reason)),
        };

        let path = self.output_dir.join(prepared.relative_path());
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = document::render(&prepared.header, DOCUMENT_BODY)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Ok(RowOutcome::Skipped(SkipReason::AlreadyExists))
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = file.write_all(content.as_bytes()) {
            // Leave no partial document behind; it would be skipped forever
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        Ok(RowOutcome::Created(path))
    }
}

pub(crate) fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::MissingName => "missing_name",
        SkipReason::EmptySlug => "empty_slug",
        SkipReason::AlreadyExists => "already_exists",
        SkipReason::MissingFpid => "missing_fpid",
        SkipReason::DuplicateFpid => "duplicate_fpid",
        SkipReason::Unparseable => "unparseable",
    }
}
