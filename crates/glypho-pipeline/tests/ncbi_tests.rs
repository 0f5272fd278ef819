//! Genome downloads against mock E-utilities and assembly directories

use glypho_pipeline::config::NcbiConfig;
use glypho_pipeline::ncbi::eutils::assembly_term;
use glypho_pipeline::ncbi::{DownloadOutcome, EutilsClient, GenomeDownloader};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const ASSEMBLY_DIR: &str = "/genomes/all/GCF_000005845.2_ASM584v2";

fn downloader(server: &MockServer, output: &TempDir) -> GenomeDownloader {
    let eutils = EutilsClient::new(NcbiConfig {
        eutils_url: server.uri(),
        request_delay_ms: 0,
        ..Default::default()
    })
    .unwrap();
    GenomeDownloader::new(eutils, output.path()).without_progress()
}

async fn mount_esearch(server: &MockServer, db: &str, term: &str, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", db))
        .and(query_param("term", term))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "header": {"type": "esearch"},
            "esearchresult": {"count": ids.len().to_string(), "idlist": ids}
        })))
        .mount(server)
        .await;
}

async fn mount_esummary(server: &MockServer, db: &str, id: &str, doc: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .and(query_param("db", db))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "header": {"type": "esummary"},
            "result": {"uids": [id], id: doc}
        })))
        .mount(server)
        .await;
}

const ARCHIVES: [&str; 2] = [
    "GCF_000005845.2_ASM584v2_genomic.fna.gz",
    "GCF_000005845.2_ASM584v2_protein.faa.gz",
];

/// Taxonomy 562 -> assembly 79781 whose directory lists two archives
async fn mount_ecoli(server: &MockServer) {
    mount_ecoli_listing(server).await;
    for name in ARCHIVES {
        Mock::given(method("GET"))
            .and(path(format!("{ASSEMBLY_DIR}/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(name.as_bytes().to_vec()))
            .expect(1)
            .mount(server)
            .await;
    }
}

/// Lookups and the directory listing, without the archives themselves
async fn mount_ecoli_listing(server: &MockServer) {
    mount_esearch(server, "taxonomy", "Escherichia coli", &["562"]).await;
    mount_esearch(server, "assembly", &assembly_term("562"), &["79781"]).await;
    mount_esummary(
        server,
        "taxonomy",
        "562",
        json!({"uid": "562", "scientificname": "Escherichia coli", "rank": "species"}),
    )
    .await;
    mount_esummary(
        server,
        "assembly",
        "79781",
        json!({
            "uid": "79781",
            "assemblyaccession": "GCF_000005845.2",
            "assemblyname": "ASM584v2",
            "ftppath_refseq": format!("{}{}", server.uri(), ASSEMBLY_DIR),
            "ftppath_genbank": ""
        }),
    )
    .await;

    let listing = r#"<html><body><pre>
<a href="../">Parent Directory</a>
<a href="GCF_000005845.2_ASM584v2_assembly_report.txt">GCF_000005845.2_ASM584v2_assembly_report.txt</a>
<a href="GCF_000005845.2_ASM584v2_genomic.fna.gz">GCF_000005845.2_ASM584v2_genomic.fna.gz</a>
<a href="GCF_000005845.2_ASM584v2_protein.faa.gz">GCF_000005845.2_ASM584v2_protein.faa.gz</a>
<a href="md5checksums.txt">md5checksums.txt</a>
</pre></body></html>"#;

    Mock::given(method("GET"))
        .and(path(format!("{ASSEMBLY_DIR}/")))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(server)
        .await;
}

fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_resolve_species() {
    let server = MockServer::start().await;
    mount_ecoli(&server).await;
    let output = TempDir::new().unwrap();

    let resolved = downloader(&server, &output)
        .resolve_species("Escherichia_coli")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(resolved.scientific_name, "Escherichia coli");
    assert_eq!(resolved.taxid, "562");
    assert_eq!(resolved.assembly_uid, "79781");
}

#[tokio::test]
async fn test_resolve_skips_taxa_without_assembly() {
    let server = MockServer::start().await;
    mount_esearch(&server, "taxonomy", "Shigella flexneri", &["1", "623"]).await;
    mount_esearch(&server, "assembly", &assembly_term("1"), &[]).await;
    mount_esearch(&server, "assembly", &assembly_term("623"), &["5501"]).await;
    mount_esummary(&server, "taxonomy", "623", json!({"scientificname": "Shigella flexneri"})).await;
    let output = TempDir::new().unwrap();

    let resolved = downloader(&server, &output)
        .resolve_species("Shigella flexneri")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(resolved.taxid, "623");
    assert_eq!(resolved.assembly_uid, "5501");
}

#[tokio::test]
async fn test_download_genome_fetches_matching_archives() {
    let server = MockServer::start().await;
    mount_ecoli(&server).await;
    let output = TempDir::new().unwrap();

    let outcome = downloader(&server, &output)
        .download_genome("Escherichia_coli")
        .await
        .unwrap();

    let species_dir = output.path().join("Escherichia_coli");
    assert_eq!(
        outcome,
        DownloadOutcome::Downloaded {
            dir: species_dir.clone(),
            downloaded: 2,
            failed: 0,
        }
    );

    assert_eq!(dir_entries(&species_dir), ARCHIVES.to_vec());
    assert_eq!(
        fs::read(species_dir.join("GCF_000005845.2_ASM584v2_genomic.fna.gz")).unwrap(),
        b"GCF_000005845.2_ASM584v2_genomic.fna.gz"
    );
}

#[tokio::test]
async fn test_existing_species_dir_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let species_dir = output.path().join("Escherichia_coli");
    fs::create_dir(&species_dir).unwrap();
    fs::write(species_dir.join(ARCHIVES[0]), b"archive").unwrap();

    let outcome = downloader(&server, &output)
        .download_genome("Escherichia coli")
        .await
        .unwrap();
    assert_eq!(outcome, DownloadOutcome::AlreadyPresent(species_dir));
}

#[tokio::test]
async fn test_no_taxonomy_match() {
    let server = MockServer::start().await;
    mount_esearch(&server, "taxonomy", "Nonexistent species", &[]).await;
    let output = TempDir::new().unwrap();

    let outcome = downloader(&server, &output)
        .download_genome("Nonexistent_species")
        .await
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::NoMatch);
    assert!(!output.path().join("Nonexistent_species").exists());
}

#[tokio::test]
async fn test_assembly_without_ftp_path() {
    let server = MockServer::start().await;
    mount_esearch(&server, "taxonomy", "Escherichia coli", &["562"]).await;
    mount_esearch(&server, "assembly", &assembly_term("562"), &["79781"]).await;
    mount_esummary(&server, "taxonomy", "562", json!({"scientificname": "Escherichia coli"})).await;
    mount_esummary(
        &server,
        "assembly",
        "79781",
        json!({"assemblyaccession": "GCF_000005845.2", "ftppath_refseq": "", "ftppath_genbank": ""}),
    )
    .await;
    let output = TempDir::new().unwrap();

    let outcome = downloader(&server, &output)
        .download_genome("Escherichia_coli")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DownloadOutcome::NoAssemblyPath {
            accession: "GCF_000005845.2".to_string()
        }
    );
}

#[tokio::test]
async fn test_download_all_continues_after_failure() {
    let server = MockServer::start().await;
    mount_ecoli(&server).await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("term", "Broken species"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let outcomes = downloader(&server, &output)
        .download_all(&["Broken_species".to_string(), "Escherichia_coli".to_string()])
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].1, None);
    assert!(matches!(outcomes[1].1, Some(DownloadOutcome::Downloaded { downloaded: 2, .. })));
}

#[tokio::test]
async fn test_resolve_moves_past_failing_candidate() {
    let server = MockServer::start().await;
    mount_esearch(&server, "taxonomy", "Shigella flexneri", &["1", "623"]).await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("term", assembly_term("1")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_esearch(&server, "assembly", &assembly_term("623"), &["5501"]).await;
    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .and(query_param("db", "taxonomy"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let resolved = downloader(&server, &output)
        .resolve_species("Shigella_flexneri")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(resolved.taxid, "623");
    assert_eq!(resolved.assembly_uid, "5501");
    assert_eq!(resolved.scientific_name, "Shigella flexneri");
}

#[tokio::test]
async fn test_failed_archives_leave_nothing_behind() {
    let server = MockServer::start().await;
    mount_ecoli_listing(&server).await;
    for name in ARCHIVES {
        Mock::given(method("GET"))
            .and(path(format!("{ASSEMBLY_DIR}/{name}")))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{ASSEMBLY_DIR}/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(name.as_bytes().to_vec()))
            .mount(&server)
            .await;
    }
    let output = TempDir::new().unwrap();
    let species_dir = output.path().join("Escherichia_coli");
    let downloader = downloader(&server, &output);

    let first = downloader.download_genome("Escherichia_coli").await.unwrap();
    assert_eq!(first, DownloadOutcome::AllFailed { failed: 2 });
    assert!(!species_dir.exists());

    let second = downloader.download_genome("Escherichia_coli").await.unwrap();
    assert_eq!(
        second,
        DownloadOutcome::Downloaded {
            dir: species_dir.clone(),
            downloaded: 2,
            failed: 0,
        }
    );
    assert_eq!(dir_entries(&species_dir), ARCHIVES.to_vec());
}

#[tokio::test]
async fn test_failed_archive_is_counted_and_not_kept() {
    let server = MockServer::start().await;
    mount_ecoli_listing(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{ASSEMBLY_DIR}/{}", ARCHIVES[0])))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"genome".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{ASSEMBLY_DIR}/{}", ARCHIVES[1])))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let outcome = downloader(&server, &output)
        .download_genome("Escherichia_coli")
        .await
        .unwrap();

    let species_dir = output.path().join("Escherichia_coli");
    assert_eq!(
        outcome,
        DownloadOutcome::Downloaded {
            dir: species_dir.clone(),
            downloaded: 1,
            failed: 1,
        }
    );
    assert_eq!(dir_entries(&species_dir), vec![ARCHIVES[0].to_string()]);
}

#[tokio::test]
async fn test_leftover_partial_download_does_not_count_as_present() {
    let server = MockServer::start().await;
    mount_ecoli(&server).await;
    let output = TempDir::new().unwrap();
    let species_dir = output.path().join("Escherichia_coli");
    fs::create_dir(&species_dir).unwrap();
    fs::write(species_dir.join(format!("{}.part", ARCHIVES[0])), b"trunc").unwrap();

    let outcome = downloader(&server, &output)
        .download_genome("Escherichia_coli")
        .await
        .unwrap();

    assert!(matches!(outcome, DownloadOutcome::Downloaded { downloaded: 2, failed: 0, .. }));
    assert_eq!(dir_entries(&species_dir), ARCHIVES.to_vec());
}

#[tokio::test]
async fn test_requests_are_spaced_by_configured_delay() {
    let server = MockServer::start().await;
    mount_esearch(&server, "taxonomy", "Escherichia coli", &["562"]).await;
    let eutils = EutilsClient::new(NcbiConfig {
        eutils_url: server.uri(),
        request_delay_ms: 150,
        ..Default::default()
    })
    .unwrap();

    let started = Instant::now();
    eutils.esearch("taxonomy", "Escherichia coli", 20).await.unwrap();
    let after_first = started.elapsed();
    eutils.esearch("taxonomy", "Escherichia coli", 20).await.unwrap();
    let after_second = started.elapsed();

    assert!(after_first >= Duration::from_millis(150), "first call took {after_first:?}");
    assert!(
        after_second - after_first >= Duration::from_millis(150),
        "second call took {:?}",
        after_second - after_first
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
