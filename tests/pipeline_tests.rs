use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

use fp_pipeline::app::IdentityStorePort;
use fp_pipeline::config::{ExportConfig, ImportConfig};
use fp_pipeline::error::{PipelineError, Result};
use fp_pipeline::pipeline::export::{parse_document, sync_batches};
use fp_pipeline::pipeline::import::{prepare_document, PersonRow};
use fp_pipeline::pipeline::normalize::{decade_bucket, derive_fpid, fame_tier};
use fp_pipeline::pipeline::{Exporter, Importer};
use fp_pipeline::storage::InMemoryStore;
use fp_pipeline::types::{
    FameTier, IdentityMeta, IdentityPayload, ParsedDocument, RelationshipDetails, RelationshipRow,
    SkipReason,
};

/// Records every call and fails the upsert calls listed in `fail_upserts` (1-based).
#[derive(Default)]
struct RecordingStore {
    upserts: Mutex<Vec<usize>>,
    deletes: Mutex<Vec<Vec<String>>>,
    inserts: Mutex<Vec<usize>>,
    fail_upserts: Vec<usize>,
    fail_inserts: bool,
}

#[async_trait]
impl IdentityStorePort for RecordingStore {
    async fn upsert_identities(&self, identities: &[IdentityPayload]) -> Result<()> {
        let mut calls = self.upserts.lock().unwrap();
        calls.push(identities.len());
        if self.fail_upserts.contains(&calls.len()) {
            return Err(PipelineError::Api {
                status: 503,
                message: "identities upsert failed: unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn delete_relationships(&self, source_fpids: &[String]) -> Result<()> {
        self.deletes.lock().unwrap().push(source_fpids.to_vec());
        Ok(())
    }

    async fn insert_relationships(&self, rows: &[RelationshipRow]) -> Result<()> {
        self.inserts.lock().unwrap().push(rows.len());
        if self.fail_inserts {
            return Err(PipelineError::Api {
                status: 409,
                message: "relationships insert failed".to_string(),
            });
        }
        Ok(())
    }
}

fn payload(fpid: &str) -> IdentityPayload {
    IdentityPayload {
        fpid: fpid.to_string(),
        slug: fpid.to_lowercase(),
        full_name: None,
        record_type: "Person".to_string(),
        net_worth: None,
        height_cm: None,
        birth_date: None,
        country: Vec::new(),
        gender: None,
        mbti: None,
        zodiac: None,
        occupation: Vec::new(),
        image_url: None,
        wikipedia_url: None,
        bio_summary: String::new(),
        content_md: String::new(),
        social_links: Default::default(),
        meta: IdentityMeta::default(),
        sitelinks: 0,
        fame_tier: None,
        data_sources: Default::default(),
    }
}

fn documents(n: usize) -> Vec<ParsedDocument> {
    (0..n)
        .map(|i| {
            let fpid = format!("FP-1900-person-{:03}", i);
            let relationships = if i % 10 == 0 {
                vec![RelationshipRow {
                    source_fpid: fpid.clone(),
                    target_fpid: "FP-1815-ada-lovelace".to_string(),
                    relation_type: "unknown".to_string(),
                    details: RelationshipDetails { years: serde_json::Value::Null },
                }]
            } else {
                Vec::new()
            };
            ParsedDocument { payload: payload(&fpid), relationships }
        })
        .collect()
}

fn import_config(csv: PathBuf, out: PathBuf) -> ImportConfig {
    ImportConfig {
        csv_path: csv,
        output_dir: out,
        chunk_size: 2,
    }
}

#[tokio::test]
async fn test_batches_of_fifty_with_one_failure() {
    let store = RecordingStore {
        fail_upserts: vec![2],
        ..Default::default()
    };
    let docs = documents(125);

    let stats = sync_batches(&store, &docs, 50).await;

    assert_eq!(*store.upserts.lock().unwrap(), vec![50, 50, 25]);
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.synced, 75);
    assert_eq!(stats.errors, 50);
    assert_eq!(stats.relationship_errors, 0);

    // Relationships are only replaced for batches whose upsert succeeded
    let deletes = store.deletes.lock().unwrap();
    assert_eq!(deletes.len(), 2);
    assert_eq!(deletes[0].len(), 50);
    assert_eq!(deletes[0][0], "FP-1900-person-000");
    assert_eq!(deletes[1].len(), 25);
    assert_eq!(deletes[1][0], "FP-1900-person-100");
    assert_eq!(*store.inserts.lock().unwrap(), vec![5, 3]);
}

#[tokio::test]
async fn test_relationship_failure_keeps_batch_synced() {
    let store = RecordingStore {
        fail_inserts: true,
        ..Default::default()
    };
    let stats = sync_batches(&store, &documents(20), 50).await;

    assert_eq!(stats.synced, 20);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.relationship_errors, 1);
}

#[tokio::test]
async fn test_batch_without_relationships_still_clears_stale_rows() {
    let store = RecordingStore::default();
    let docs: Vec<ParsedDocument> = documents(20).into_iter().filter(|d| d.relationships.is_empty()).collect();

    sync_batches(&store, &docs, 50).await;

    assert_eq!(store.deletes.lock().unwrap().len(), 1);
    assert!(store.inserts.lock().unwrap().is_empty());
}

#[test]
fn test_import_then_parse_round_trip() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("export.csv");
    fs::write(
        &csv_path,
        "name,birth_year,birth_date,country,gender,occupation,imdb_id,wikidata_id,sitelinks\n\
         Ada Lovelace,1815.0,1815-12-10,United Kingdom,female,mathematician;writer;mathematician,,Q7259,120\n\
         Zoë Saldaña,1978,,United States|Dominican Republic,Female,actor,nm0757855,Q190162,85\n",
    )
    .unwrap();
    let out = dir.path().join("vault");

    let stats = Importer::new(&import_config(csv_path.clone(), out.clone()))
        .run(&csv_path)
        .unwrap();
    assert_eq!(stats.created, 2);

    let rows = [
        PersonRow {
            name: Some("Ada Lovelace".into()),
            birth_year: Some("1815.0".into()),
            birth_date: Some("1815-12-10".into()),
            country: Some("United Kingdom".into()),
            gender: Some("female".into()),
            occupation: Some("mathematician;writer;mathematician".into()),
            wikidata_id: Some("Q7259".into()),
            sitelinks: Some("120".into()),
            ..Default::default()
        },
        PersonRow {
            name: Some("Zoë Saldaña".into()),
            birth_year: Some("1978".into()),
            country: Some("United States|Dominican Republic".into()),
            gender: Some("Female".into()),
            occupation: Some("actor".into()),
            imdb_id: Some("nm0757855".into()),
            wikidata_id: Some("Q190162".into()),
            sitelinks: Some("85".into()),
            ..Default::default()
        },
    ];

    for row in &rows {
        let prepared = prepare_document(row).unwrap();
        let parsed = parse_document(&out.join(prepared.relative_path())).unwrap().unwrap();
        let h = &prepared.header;
        let p = &parsed.payload;

        assert_eq!(p.fpid, h.fpid);
        assert_eq!(p.slug, h.slug);
        assert_eq!(p.full_name.as_deref(), Some(h.name.as_str()));
        assert_eq!(p.birth_date, h.birth_date);
        assert_eq!(p.country, h.country);
        assert_eq!(p.gender, h.gender);
        assert_eq!(p.occupation, h.occupation);
        assert_eq!(p.sitelinks, h.sitelinks);
        assert_eq!(p.net_worth, h.net_worth);
        assert_eq!(p.meta.ids.get("wikidata"), Some(&serde_json::json!(h.ids.wikidata)));
        assert_eq!(p.content_md, "# Notes");
        assert!(parsed.relationships.is_empty());
    }
}

#[tokio::test]
async fn test_end_to_end_into_memory_store() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("export.csv");
    fs::write(
        &csv_path,
        "name,birth_year,birth_date,gender,sitelinks\n\
         Ada Lovelace,1815,1815-12-10,female,120\n\
         ,1900,,male,3\n",
    )
    .unwrap();
    let vault = dir.path().join("vault");

    let import = Importer::new(&import_config(csv_path.clone(), vault.clone()))
        .run(&csv_path)
        .unwrap();
    assert_eq!(import.created, 1);
    assert_eq!(import.skipped, 1);
    assert_eq!(import.skip_reasons[&SkipReason::MissingName], 1);

    let path = vault.join("1810-1819").join("FP-1815-ada-lovelace.md");
    assert!(path.exists());
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("---\n"));
    assert!(text.ends_with("---\n\n# Notes\n"));

    let store = InMemoryStore::new();
    let export = Exporter::new(
        Arc::new(store.clone()),
        ExportConfig {
            vault_path: vault,
            batch_size: 50,
            max_workers: 4,
        },
    )
    .run()
    .await
    .unwrap();

    assert_eq!(export.processed, 1);
    assert_eq!(export.synced, 1);
    assert_eq!(export.skipped, 0);
    let ada = store.identity("FP-1815-ada-lovelace").unwrap();
    assert_eq!(ada.fame_tier, Some(FameTier::S));
    assert_eq!(ada.birth_date.as_deref(), Some("1815-12-10"));
}

#[test]
fn test_reimport_is_idempotent() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("export.csv");
    fs::write(&csv_path, "name,birth_year\nAlan Turing,1912\n").unwrap();
    let importer = Importer::new(&import_config(csv_path.clone(), dir.path().join("vault")));

    let first = importer.run(&csv_path).unwrap();
    let second = importer.run(&csv_path).unwrap();

    assert_eq!(first.created, 1);
    assert_eq!(second.created, 0);
    assert_eq!(second.skip_reasons[&SkipReason::AlreadyExists], 1);
}

#[test]
fn test_fpid_is_deterministic() {
    let names = ["Ada Lovelace", "Zoë Saldaña", "Beyoncé", "  Alan   Turing  "];
    for name in names {
        for year in [Some("1815"), Some("1815.7"), None, Some("abc")] {
            assert_eq!(derive_fpid(Some(name), year), derive_fpid(Some(name), year));
        }
    }
    assert_eq!(
        derive_fpid(Some("Ada Lovelace"), Some("1815.7")).map(|f| f.id),
        Some("FP-1815-ada-lovelace".to_string())
    );
}

#[test]
fn test_tier_is_monotonic() {
    let rank = |t: Option<FameTier>| match t {
        None => 0,
        Some(FameTier::C) => 1,
        Some(FameTier::B) => 2,
        Some(FameTier::A) => 3,
        Some(FameTier::S) => 4,
    };
    let mut previous = 0;
    for sitelinks in 0..300u64 {
        let current = rank(fame_tier(sitelinks));
        assert!(current >= previous, "tier dropped at {}", sitelinks);
        previous = current;
    }
}

#[test]
fn test_every_year_lands_in_its_decade() {
    for year in -120i64..2030 {
        let bucket = decade_bucket(&year.to_string());
        let start = year.div_euclid(10) * 10;
        assert_eq!(bucket, format!("{}-{}", start, start + 9));
    }
}
