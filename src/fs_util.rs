use std::fmt::Display;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use zip::ZipArchive;

use crate::error::ResolverError;

const CHECKLIST_COLUMNS: [&str; 3] = ["kew_id", "taxon_name", "taxonomic_status"];

fn fs_error(err: impl Display) -> ResolverError {
    ResolverError::Filesystem(err.to_string())
}

fn is_table(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("txt" | "csv")
    )
}

/// Unpacks every member of the archive below `target_dir` and returns the
/// `.txt`/`.csv` members in archive order. Reading a member to the end
/// verifies its checksum, so a truncated download fails here.
pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>, ResolverError> {
    let file = fs::File::open(zip_path).map_err(|err| {
        ResolverError::Filesystem(format!("open zip {}: {err}", zip_path.display()))
    })?;
    let mut archive = ZipArchive::new(file).map_err(fs_error)?;

    let mut tables = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).map_err(fs_error)?;
        let Some(relative) = member.enclosed_name() else {
            return Err(ResolverError::Filesystem(format!(
                "zip member {} escapes the extraction directory",
                member.name()
            )));
        };
        let destination = target_dir.join(relative);
        if member.is_dir() {
            fs::create_dir_all(&destination).map_err(fs_error)?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(fs_error)?;
        }
        let mut outfile = fs::File::create(&destination).map_err(fs_error)?;
        io::copy(&mut member, &mut outfile).map_err(|err| {
            ResolverError::Filesystem(format!("extract {}: {err}", member.name()))
        })?;
        if is_table(&destination) {
            tables.push(destination);
        }
    }
    Ok(tables)
}

pub fn decompress_gzip(gz_path: &Path, destination: &Path) -> Result<(), ResolverError> {
    let file = fs::File::open(gz_path).map_err(|err| {
        ResolverError::Filesystem(format!("open gzip {}: {err}", gz_path.display()))
    })?;
    let mut decoder = GzDecoder::new(file);
    let mut outfile = fs::File::create(destination).map_err(fs_error)?;
    io::copy(&mut decoder, &mut outfile).map_err(fs_error)?;
    Ok(())
}

fn has_checklist_header(path: &Path) -> Result<bool, ResolverError> {
    let file = fs::File::open(path).map_err(fs_error)?;
    let mut header = String::new();
    BufReader::new(file)
        .read_line(&mut header)
        .map_err(fs_error)?;
    let columns: Vec<&str> = header
        .trim_start_matches('\u{feff}')
        .trim_end()
        .split('|')
        .map(str::trim)
        .collect();
    Ok(CHECKLIST_COLUMNS
        .iter()
        .all(|column| columns.contains(column)))
}

pub fn find_checklist_table(tables: &[PathBuf]) -> Result<Option<PathBuf>, ResolverError> {
    for table in tables {
        if has_checklist_header(table)? {
            return Ok(Some(table.clone()));
        }
    }
    Ok(None)
}
