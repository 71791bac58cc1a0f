use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

use crate::app::ports::IdentityStorePort;
use crate::config::SupabaseCredentials;
use crate::constants::{IDENTITIES_TABLE, IDENTITY_CONFLICT_KEY, RELATIONSHIPS_TABLE};
use crate::error::{PipelineError, Result};
use crate::types::{IdentityPayload, RelationshipRow};

/// Response bodies are truncated to this many characters in error messages.
const ERROR_BODY_LIMIT: usize = 300;

/// PostgREST client for the Supabase `identities` and `relationships` tables
pub struct SupabaseStore {
    client: reqwest::Client,
    rest_base: String,
}

impl SupabaseStore {
    pub fn new(credentials: &SupabaseCredentials) -> Result<Self> {
        let key = credentials.service_role_key.as_str();
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", key))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(credentials.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            rest_base: format!("{}/rest/v1", credentials.url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_base, table)
    }

    async fn check(resp: reqwest::Response, action: &str) -> Result<()> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        Err(PipelineError::Api {
            status: status.as_u16(),
            message: format!("{} failed: {}", action, snippet),
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| PipelineError::Config("Supabase key contains invalid header characters".to_string()))
}

/// PostgREST `in.(...)` filter with every value double-quoted.
pub fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl IdentityStorePort for SupabaseStore {
    async fn upsert_identities(&self, identities: &[IdentityPayload]) -> Result<()> {
        if identities.is_empty() {
            return Ok(());
        }
        let resp = self
            .client
            .post(self.table_url(IDENTITIES_TABLE))
            .query(&[("on_conflict", IDENTITY_CONFLICT_KEY)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(identities)
            .send()
            .await?;
        Self::check(resp, "identities upsert").await?;
        debug!("Upserted {} identities", identities.len());
        Ok(())
    }

    async fn delete_relationships(&self, source_fpids: &[String]) -> Result<()> {
        if source_fpids.is_empty() {
            return Ok(());
        }
        let filter = in_filter(source_fpids);
        let resp = self
            .client
            .delete(self.table_url(RELATIONSHIPS_TABLE))
            .query(&[("source_fpid", filter.as_str())])
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        Self::check(resp, "relationships delete").await?;
        debug!("Cleared relationships for {} sources", source_fpids.len());
        Ok(())
    }

    async fn insert_relationships(&self, rows: &[RelationshipRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let resp = self
            .client
            .post(self.table_url(RELATIONSHIPS_TABLE))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(resp, "relationships insert").await?;
        debug!("Inserted {} relationships", rows.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(url: &str) -> SupabaseCredentials {
        SupabaseCredentials {
            url: url.to_string(),
            service_role_key: "service-key".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_in_filter_quotes_values() {
        let filter = in_filter(&["FP-1815-ada-lovelace".to_string(), "FP-0000-a,b".to_string()]);
        assert_eq!(filter, r#"in.("FP-1815-ada-lovelace","FP-0000-a,b")"#);
    }

    #[test]
    fn test_table_urls() {
        let store = SupabaseStore::new(&credentials("https://abc.supabase.co/")).unwrap();
        assert_eq!(store.table_url("identities"), "https://abc.supabase.co/rest/v1/identities");
    }

    #[test]
    fn test_rejects_key_with_newline() {
        let mut creds = credentials("https://abc.supabase.co");
        creds.service_role_key = "bad\nkey".to_string();
        assert!(SupabaseStore::new(&creds).is_err());
    }
}
