//! UniProt client and enrichment against a mock REST server

use glypho_common::types::shikimate_ecs;
use glypho_pipeline::config::UniProtConfig;
use glypho_pipeline::enrich::{self, EnrichOptions};
use glypho_pipeline::uniprot::{self, QueryFilter, UniProtClient, UniProtHit};
use glypho_pipeline::PipelineError;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param, query_param_is_missing},
    Mock, MockServer, ResponseTemplate,
};

const TSV_HEADER: &str = "Entry\tEntry Name\tProtein names\tOrganism\tEC number\n";

fn client(server: &MockServer) -> UniProtClient {
    UniProtClient::new(UniProtConfig {
        base_url: server.uri(),
        ..Default::default()
    })
    .unwrap()
}

fn tsv(rows: &[&str]) -> String {
    let mut body = TSV_HEADER.to_string();
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    body
}

fn hit(species: &str, ec: &str, cluster: &str) -> UniProtHit {
    UniProtHit {
        accession: format!("{species}-{ec}"),
        ec: ec.to_string(),
        uniref90: Some(cluster.to_string()),
        species: Some(species.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_search_ec_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param("query", "organism_name:\"Escherichia coli\" AND ec:2.5.1.19"))
        .and(query_param("format", "tsv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(tsv(&[
            "P0A6D3\tAROA_ECOLI\t3-phosphoshikimate 1-carboxyvinyltransferase\tEscherichia coli (strain K12)\t2.5.1.19",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let hits = client(&server)
        .search("Escherichia_coli", &QueryFilter::Ec("2.5.1.19".to_string()))
        .await;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].accession, "P0A6D3");
    assert_eq!(hits[0].id, "AROA_ECOLI");
    assert_eq!(hits[0].ec, "2.5.1.19");
    assert_eq!(hits[0].uniref90, None);
}

#[tokio::test]
async fn test_search_server_error_yields_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = client(&server);
    let filter = QueryFilter::Ec("4.2.3.4".to_string());

    assert!(client.search("Escherichia coli", &filter).await.is_empty());

    let err = client.try_search("Escherichia coli", &filter).await.unwrap_err();
    assert!(matches!(err, PipelineError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_search_follows_next_link() {
    let server = MockServer::start().await;
    let next = format!(
        "<{}/uniprotkb/search?cursor=page2&fields=accession,id,protein_name,organism_name,ec&format=tsv>; rel=\"next\"",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param_is_missing("cursor"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next.as_str())
                .set_body_string(tsv(&["A1\tA1_BACFR\tshikimate kinase\tBacteroides fragilis\t2.7.1.71"])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param("cursor", "page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(tsv(&["A2\tA2_BACFR\tshikimate kinase 2\tBacteroides fragilis\t2.7.1.71"])),
        )
        .mount(&server)
        .await;

    let hits = client(&server)
        .try_search("Bacteroides fragilis", &QueryFilter::Ec("2.7.1.71".to_string()))
        .await
        .unwrap();

    let accessions: Vec<&str> = hits.iter().map(|h| h.accession.as_str()).collect();
    assert_eq!(accessions, vec!["A1", "A2"]);
}

#[tokio::test]
async fn test_failed_later_page_keeps_first_page() {
    let server = MockServer::start().await;
    let next = format!("<{}/uniprotkb/search?cursor=broken>; rel=\"next\"", server.uri());

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param_is_missing("cursor"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next.as_str())
                .set_body_string(tsv(&["A1\tA1_BACFR\tshikimate kinase\tBacteroides fragilis\t2.7.1.71"])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param("cursor", "broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let hits = client(&server)
        .try_search("Bacteroides fragilis", &QueryFilter::Ec("2.7.1.71".to_string()))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_uniref90_query_tags_hits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param(
            "query",
            "organism_name:\"Bacteroides fragilis\" AND uniref_cluster_90:UniRef90_P0A6D3",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(tsv(&[
            "Q5L8E1\tAROA_BACFN\t3-phosphoshikimate 1-carboxyvinyltransferase\tBacteroides fragilis\t2.5.1.19",
        ])))
        .mount(&server)
        .await;

    let hits = client(&server)
        .search(
            "Bacteroides_fragilis",
            &QueryFilter::UniRef90("UniRef90_P0A6D3".to_string()),
        )
        .await;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].uniref90.as_deref(), Some("UniRef90_P0A6D3"));
}

#[tokio::test]
async fn test_enrichment_skips_complete_species_and_duplicates() {
    let server = MockServer::start().await;

    // Partial x {U1, U2}; Full already covers every target EC
    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(tsv(&[
            "X1\tX1_PART\tsome enzyme\tPartial\t4.2.1.10",
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let targets = shikimate_ecs();
    let mut hits: Vec<UniProtHit> = targets.iter().map(|ec| hit("Full", ec, "U1")).collect();
    hits.push(hit("Partial", "2.5.1.19", "U1"));
    hits.push(hit("Partial", "4.2.3.4", "U1"));
    hits.push(hit("Partial", "2.7.1.71", "U2"));

    let enriched = enrich::enrich_with_uniref(&client(&server), &hits, &targets, 4).await;

    assert_eq!(enriched.len(), 2);
    assert!(enriched.iter().all(|h| h.species.as_deref() == Some("Partial")));
    let mut clusters: Vec<&str> = enriched.iter().filter_map(|h| h.uniref90.as_deref()).collect();
    clusters.sort();
    assert_eq!(clusters, vec!["U1", "U2"]);
}

#[tokio::test]
async fn test_add_ec_from_uniref_without_clusters_writes_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TSV_HEADER))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("uniref_hits.tsv");
    let hits = vec![hit("Partial", "2.5.1.19", "")];
    let options = EnrichOptions {
        max_workers: 2,
        resolve_uniref90: false,
    };

    let enriched = enrich::add_ec_from_uniref(&client(&server), hits, &shikimate_ecs(), &output, &options)
        .await
        .unwrap();

    assert!(enriched.is_empty());
    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("Entry\tEntry Name"));
    assert!(uniprot::read_hits(&output).unwrap().is_empty());
}

#[tokio::test]
async fn test_resolve_uniref90_then_enrich() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uniref/search"))
        .and(query_param("query", "uniprotkb:P0A6D3 AND identity:0.9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Cluster ID\nUniRef90_P0A6D3\n"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param(
            "query",
            "organism_name:\"Escherichia coli\" AND uniref_cluster_90:UniRef90_P0A6D3",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(tsv(&[
            "P0A6D3\tAROA_ECOLI\t3-phosphoshikimate 1-carboxyvinyltransferase\tEscherichia coli\t2.5.1.19",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("uniref_hits.tsv");
    let hits = vec![UniProtHit {
        accession: "P0A6D3".to_string(),
        ec: "2.5.1.19".to_string(),
        species: Some("Escherichia_coli".to_string()),
        ..Default::default()
    }];
    let options = EnrichOptions {
        max_workers: 2,
        resolve_uniref90: true,
    };

    let enriched = enrich::add_ec_from_uniref(&client(&server), hits, &shikimate_ecs(), &output, &options)
        .await
        .unwrap();

    assert_eq!(enriched.len(), 1);
    assert_eq!(enriched[0].species.as_deref(), Some("Escherichia_coli"));
    assert_eq!(uniprot::read_hits(&output).unwrap(), enriched);
}
