//! Gzip helpers for genome and protein files
//!
//! Assemblies arrive from NCBI as `.fna.gz`, and predicted proteins are
//! stored as `.faa.gz` next to them. These helpers stream between the
//! compressed and plain forms without buffering whole files in memory.

use crate::error::{GlyphoError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Decompress `input` (gzip) into `output`, returning the bytes written
pub fn gunzip_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<u64> {
    let input = input.as_ref();
    let output = output.as_ref();

    let mut decoder = GzDecoder::new(BufReader::new(File::open(input)?));
    let mut writer = BufWriter::new(File::create(output)?);
    let written =
        io::copy(&mut decoder, &mut writer).map_err(|e| GlyphoError::compression(input, e))?;
    writer.flush()?;

    debug!(
        input = %input.display(),
        output = %output.display(),
        bytes = written,
        "Decompressed file"
    );
    Ok(written)
}

/// Compress `input` into the gzip file `output`, returning the bytes read
pub fn gzip_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<u64> {
    let input = input.as_ref();
    let output = output.as_ref();

    let mut reader = BufReader::new(File::open(input)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(output)?), Compression::default());
    let read = io::copy(&mut reader, &mut encoder).map_err(|e| GlyphoError::compression(output, e))?;
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(|e| GlyphoError::compression(output, e))?;

    debug!(
        input = %input.display(),
        output = %output.display(),
        bytes = read,
        "Compressed file"
    );
    Ok(read)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_gzip_then_gunzip_file() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("proteins.faa");
        let packed = dir.path().join("proteins.faa.gz");
        let restored = dir.path().join("restored.faa");
        std::fs::write(&plain, ">gene_1\nMKV*\n").unwrap();

        gzip_file(&plain, &packed).unwrap();
        let written = gunzip_file(&packed, &restored).unwrap();

        assert_eq!(written, 13);
        assert_eq!(std::fs::read_to_string(&restored).unwrap(), ">gene_1\nMKV*\n");
    }

    #[test]
    fn test_gunzip_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = gunzip_file(dir.path().join("absent.fna.gz"), dir.path().join("out.fna"));
        assert!(matches!(err, Err(GlyphoError::Io(_))));
    }
}
