use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const END_RECORD_SIGNATURE: &[u8] = b"PK\x05\x06";
const END_RECORD_LEN: usize = 22;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("zip format error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("input path not found: {0}")]
    NotFound(PathBuf),
}

/// Pack a file or directory tree into deflated ZIP bytes.
///
/// A single file is stored under its base name; a directory's files are
/// stored under their paths relative to the directory. The archive is staged
/// in a temporary file next to the input, removed on every exit path.
pub fn pack(input: &Path) -> Result<Vec<u8>, ArchiveError> {
    if !input.exists() {
        return Err(ArchiveError::NotFound(input.to_path_buf()));
    }

    let parent = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut staging = tempfile::Builder::new()
        .suffix(".zip")
        .tempfile_in(parent)?;

    write_zip(input, staging.as_file_mut())?;

    let mut bytes = Vec::new();
    let file = staging.as_file_mut();
    file.rewind()?;
    file.read_to_end(&mut bytes)?;

    info!("packed {} into {} archive bytes", input.display(), bytes.len());
    Ok(bytes)
}

fn write_zip<W: Write + Seek>(input: &Path, writer: W) -> Result<(), ArchiveError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    if input.is_dir() {
        let mut files = Vec::new();
        collect_files(input, &mut files)?;
        files.sort();
        for path in files {
            let name = entry_name(path.strip_prefix(input).unwrap_or(&path));
            add_file(&mut zip, &path, name, options)?;
        }
    } else {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ArchiveError::NotFound(input.to_path_buf()))?;
        add_file(&mut zip, input, name, options)?;
    }

    zip.finish()?;
    Ok(())
}

fn add_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &Path,
    name: String,
    options: SimpleFileOptions,
) -> Result<(), ArchiveError> {
    debug!("adding {} as {}", path.display(), name);
    zip.start_file(name, options)?;
    let mut reader = BufReader::new(File::open(path)?);
    io::copy(&mut reader, zip)?;
    Ok(())
}

/// Regular files under `dir`, recursively. Empty directories are not recorded.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// ZIP entry names always use `/`.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Cut anything following the end-of-central-directory record.
///
/// Decoded payloads end with zero bytes from the last frame's padding.
fn trim_after_end_record(bytes: &[u8]) -> &[u8] {
    let Some(pos) = memchr::memmem::rfind(bytes, END_RECORD_SIGNATURE) else {
        return bytes;
    };
    let comment_len_at = pos + END_RECORD_LEN - 2;
    if comment_len_at + 2 > bytes.len() {
        return bytes;
    }
    let comment_len =
        u16::from_le_bytes([bytes[comment_len_at], bytes[comment_len_at + 1]]) as usize;
    let end = pos + END_RECORD_LEN + comment_len;
    if end < bytes.len() {
        debug!("ignoring {} bytes after zip end record", bytes.len() - end);
        &bytes[..end]
    } else {
        bytes
    }
}

/// Extract ZIP bytes into `out_dir`, returning the entry names in archive order.
///
/// The bytes are staged in a temporary file inside `out_dir`, removed on every
/// exit path. Trailing bytes after the central directory are tolerated.
pub fn unpack(bytes: &[u8], out_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    fs::create_dir_all(out_dir)?;

    let bytes = trim_after_end_record(bytes);
    let mut staging: NamedTempFile = tempfile::Builder::new()
        .suffix(".zip")
        .tempfile_in(out_dir)?;
    staging.write_all(bytes)?;
    staging.flush()?;

    let mut archive = ZipArchive::new(BufReader::new(staging.reopen()?))?;
    let names: Vec<PathBuf> = archive.file_names().map(PathBuf::from).collect();
    archive.extract(out_dir)?;

    info!("extracted {} entries into {}", names.len(), out_dir.display());
    Ok(names)
}
