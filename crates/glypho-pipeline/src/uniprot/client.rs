//! UniProt REST client
//!
//! Wraps `uniprotkb/search` and `uniref/search` with TSV responses. Search
//! results follow `Link: <..>; rel="next"` headers up to the configured page
//! cap.

use super::types::{build_query, QueryFilter, UniProtHit, SEARCH_FIELDS};
use crate::config::UniProtConfig;
use crate::error::{PipelineError, Result};
use crate::tsv::{self, Table};
use reqwest::header::{HeaderMap, LINK};
use reqwest::Client;
use tracing::{debug, error, warn};
use url::Url;

const SERVICE: &str = "UniProt";

/// Column holding the cluster id in `uniref/search` responses
const CLUSTER_ID_COLUMN: &str = "Cluster ID";

/// UniProt API client
#[derive(Clone)]
pub struct UniProtClient {
    client: Client,
    config: UniProtConfig,
}

impl UniProtClient {
    pub fn new(config: UniProtConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("glypho/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &UniProtConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Search entries of `organism` matching `filter`.
    ///
    /// Failures are logged and yield no hits.
    pub async fn search(&self, organism: &str, filter: &QueryFilter) -> Vec<UniProtHit> {
        match self.try_search(organism, filter).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(
                    "Error for query: {}: {}",
                    build_query(organism, filter),
                    e
                );
                Vec::new()
            },
        }
    }

    /// Fallible form of [`UniProtClient::search`]
    pub async fn try_search(&self, organism: &str, filter: &QueryFilter) -> Result<Vec<UniProtHit>> {
        let query = build_query(organism, filter);
        debug!(query = %query, "Searching UniProtKB");

        let size = self.config.page_size.to_string();
        let url = Url::parse_with_params(
            &self.endpoint("uniprotkb/search"),
            &[
                ("query", query.as_str()),
                ("format", "tsv"),
                ("fields", SEARCH_FIELDS),
                ("size", size.as_str()),
            ],
        )?;

        let mut hits: Vec<UniProtHit> = self.fetch_pages(url).await?;
        if let Some(id) = filter.uniref90() {
            for hit in &mut hits {
                hit.uniref90 = Some(id.to_string());
            }
        }
        Ok(hits)
    }

    /// UniRef90 cluster containing `accession`.
    ///
    /// Failures are logged and yield `None`.
    pub async fn uniref90_for_accession(&self, accession: &str) -> Option<String> {
        match self.try_uniref90_for_accession(accession).await {
            Ok(id) => id,
            Err(e) => {
                error!(accession = %accession, "UniRef90 lookup failed: {}", e);
                None
            },
        }
    }

    /// Fallible form of [`UniProtClient::uniref90_for_accession`]
    pub async fn try_uniref90_for_accession(&self, accession: &str) -> Result<Option<String>> {
        let query = format!("uniprotkb:{accession} AND identity:0.9");
        let url = Url::parse_with_params(
            &self.endpoint("uniref/search"),
            &[
                ("query", query.as_str()),
                ("format", "tsv"),
                ("fields", "id"),
                ("size", "1"),
            ],
        )?;

        let (body, _) = self.get_text(url).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let table = Table::from_reader(format!("UniRef response for {accession}"), body.as_bytes(), false)?;
        match table.column(CLUSTER_ID_COLUMN) {
            Ok(ids) => Ok(ids.into_iter().find(|id| !tsv::is_missing(id)).map(str::to_string)),
            Err(_) => {
                warn!("'{}' not found in response for accession {}", CLUSTER_ID_COLUMN, accession);
                Ok(None)
            },
        }
    }

    /// Fetch every page of a TSV search, starting at `url`.
    ///
    /// A failing first page is an error; a failing later page ends the walk
    /// with the rows collected so far.
    async fn fetch_pages(&self, url: Url) -> Result<Vec<UniProtHit>> {
        let mut rows = Vec::new();
        let mut next = Some(url);
        let mut page = 0;

        while let Some(url) = next.take() {
            if page >= self.config.max_pages {
                warn!(pages = page, "Stopping UniProt pagination at page cap");
                break;
            }

            let result = self.get_text(url).await;
            let (body, headers) = match result {
                Ok(ok) => ok,
                Err(e) if page > 0 => {
                    warn!(page = page + 1, "UniProt page request failed, keeping {} rows: {}", rows.len(), e);
                    break;
                },
                Err(e) => return Err(e),
            };
            page += 1;

            if !body.trim().is_empty() {
                rows.extend(tsv::parse_records::<UniProtHit, _>(body.as_bytes())?);
            }

            next = next_link(&headers).and_then(|link| Url::parse(&link).ok());
        }

        Ok(rows)
    }

    async fn get_text(&self, url: Url) -> Result<(String, HeaderMap)> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PipelineError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        Ok((body, headers))
    }
}

/// Target of the `rel="next"` entry of a `Link` header.
///
/// Targets may contain commas (`fields=accession,id`), so entries are split
/// on the angle brackets rather than on `,`.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(LINK).iter().filter_map(|v| v.to_str().ok()) {
        let mut rest = value;
        while let Some(open) = rest.find('<') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('>') else {
                break;
            };
            let params = after[close + 1..].split('<').next().unwrap_or("");
            if params.contains("rel=\"next\"") {
                return Some(after[..close].trim().to_string());
            }
            rest = &after[close + 1..];
        }
    }
    None
}
