//! NCBI E-utilities client (JSON responses)
//!
//! Every call is followed by the configured delay so sequential lookups stay
//! under NCBI's request-rate limit.

use crate::config::NcbiConfig;
use crate::error::{PipelineError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

const SERVICE: &str = "NCBI E-utilities";

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ESummaryResponse {
    result: HashMap<String, serde_json::Value>,
}

/// Taxonomy document summary
#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomySummary {
    #[serde(rename = "scientificname", default)]
    pub scientific_name: String,
}

/// Assembly document summary
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssemblySummary {
    #[serde(rename = "assemblyaccession", default)]
    pub accession: String,
    #[serde(rename = "assemblyname", default)]
    pub name: String,
    #[serde(rename = "ftppath_refseq", default)]
    pub ftp_path_refseq: String,
    #[serde(rename = "ftppath_genbank", default)]
    pub ftp_path_genbank: String,
}

impl AssemblySummary {
    /// RefSeq path preferred over GenBank; empty paths count as absent
    pub fn ftp_path(&self) -> Option<&str> {
        [&self.ftp_path_refseq, &self.ftp_path_genbank]
            .into_iter()
            .map(|p| p.trim())
            .find(|p| !p.is_empty())
    }
}

/// `ftp://` locations are served over HTTPS by the same host
pub fn ftp_to_https(path: &str) -> String {
    match path.strip_prefix("ftp://") {
        Some(rest) => format!("https://{rest}"),
        None => path.to_string(),
    }
}

/// Assembly search term restricted to the latest assemblies under `taxid`
pub fn assembly_term(taxid: &str) -> String {
    format!("txid{taxid}[Organism:exp] AND latest[filter] AND all[filter]")
}

/// E-utilities client
#[derive(Clone)]
pub struct EutilsClient {
    client: Client,
    config: NcbiConfig,
}

impl EutilsClient {
    pub fn new(config: NcbiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("glypho/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Shared HTTP client, reused for file downloads
    pub fn http(&self) -> &Client {
        &self.client
    }

    fn url(&self, utility: &str, params: &[(&str, &str)]) -> Result<Url> {
        let base = format!("{}/{}.fcgi", self.config.eutils_url.trim_end_matches('/'), utility);
        let mut url = Url::parse_with_params(&base, params)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("retmode", "json");
            query.append_pair("tool", &self.config.tool);
            if let Some(email) = &self.config.email {
                query.append_pair("email", email);
            }
            if let Some(key) = &self.config.api_key {
                query.append_pair("api_key", key);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "E-utilities request");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        tokio::time::sleep(self.config.request_delay()).await;

        if !status.is_success() {
            return Err(PipelineError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Ids matching `term` in `db`, in NCBI rank order
    pub async fn esearch(&self, db: &str, term: &str, retmax: usize) -> Result<Vec<String>> {
        let retmax = retmax.to_string();
        let url = self.url("esearch", &[("db", db), ("term", term), ("retmax", retmax.as_str())])?;
        let response: ESearchResponse = self.get_json(url).await?;
        Ok(response.esearchresult.idlist)
    }

    async fn esummary<T: DeserializeOwned>(&self, db: &str, id: &str) -> Result<Option<T>> {
        let url = self.url("esummary", &[("db", db), ("id", id)])?;
        let mut response: ESummaryResponse = self.get_json(url).await?;
        response
            .result
            .remove(id)
            .map(serde_json::from_value)
            .transpose()
            .map_err(PipelineError::from)
    }

    pub async fn taxonomy_summary(&self, taxid: &str) -> Result<Option<TaxonomySummary>> {
        self.esummary("taxonomy", taxid).await
    }

    pub async fn assembly_summary(&self, uid: &str) -> Result<Option<AssemblySummary>> {
        self.esummary("assembly", uid).await
    }
}
