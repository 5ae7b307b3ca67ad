//! Snapshot archive packing
//!
//! Packs a finished working tree into a single `.tar.zst` archive. Paths in
//! the archive are relative to the working tree root (`metadata.json`,
//! `mgmt/users/0.json`, ...).
//!
//! The archive is written to a temporary sibling file and renamed into place,
//! so the final path either holds a complete archive or does not exist.

use snapshot_core::{SnapshotError, SnapshotResult};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, HeaderMode};
use xxhash_rust::xxh3::Xxh3;

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Result of packing a working tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Final archive path
    pub path: PathBuf,
    /// Number of files packed
    pub file_count: u64,
    /// Archive size on disk
    pub size_bytes: u64,
    /// xxh3 checksum of the archive, hex encoded
    pub checksum: String,
}

/// Writer for snapshot archives
pub struct SnapshotArchiveWriter {
    compression_level: i32,
}

impl SnapshotArchiveWriter {
    /// Create a writer with the given zstd level
    pub fn new(compression_level: i32) -> Self {
        Self { compression_level }
    }

    /// Create a writer with the default level
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }

    /// Pack `source_dir` into the archive at `path`
    ///
    /// Either the complete archive is written or no file is left behind.
    pub fn write(&self, source_dir: &Path, path: &Path) -> SnapshotResult<ArchiveInfo> {
        let temp_path = path.with_extension("tmp");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        match self.write_inner(source_dir, &temp_path) {
            Ok(file_count) => {
                fs::rename(&temp_path, path).map_err(|e| {
                    let _ = fs::remove_file(&temp_path);
                    SnapshotError::archive_write(format!("rename to '{}': {}", path.display(), e))
                })?;
                let size_bytes = fs::metadata(path)?.len();
                let checksum = xxh3_file_hex(path)?;
                Ok(ArchiveInfo {
                    path: path.to_path_buf(),
                    file_count,
                    size_bytes,
                    checksum,
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    fn write_inner(&self, source_dir: &Path, path: &Path) -> SnapshotResult<u64> {
        if !source_dir.is_dir() {
            return Err(SnapshotError::archive_write(format!(
                "'{}' is not a directory",
                source_dir.display()
            )));
        }

        let file = File::create(path)?;
        let buf_writer = BufWriter::new(file);
        let zstd_writer = zstd::Encoder::new(buf_writer, self.compression_level)
            .map_err(|e| SnapshotError::archive_write(format!("zstd encoder: {}", e)))?;

        let mut tar_builder = Builder::new(zstd_writer);
        tar_builder.mode(HeaderMode::Deterministic);

        let file_count = append_tree(&mut tar_builder, source_dir, Path::new(""))?;

        let zstd_writer = tar_builder
            .into_inner()
            .map_err(|e| SnapshotError::archive_write(format!("tar finish: {}", e)))?;
        let mut buf_writer = zstd_writer
            .finish()
            .map_err(|e| SnapshotError::archive_write(format!("zstd finish: {}", e)))?;
        buf_writer.flush()?;

        Ok(file_count)
    }
}

/// Append a directory's contents in name order; returns the file count
fn append_tree<W: Write>(
    builder: &mut Builder<W>,
    dir: &Path,
    prefix: &Path,
) -> SnapshotResult<u64> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut count = 0;
    for entry in entries {
        let name = prefix.join(entry.file_name());
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            builder
                .append_dir(&name, &path)
                .map_err(|e| SnapshotError::archive_write(format!("append '{}': {}", name.display(), e)))?;
            count += append_tree(builder, &path, &name)?;
        } else {
            builder
                .append_path_with_name(&path, &name)
                .map_err(|e| SnapshotError::archive_write(format!("append '{}': {}", name.display(), e)))?;
            count += 1;
        }
    }
    Ok(count)
}

fn xxh3_file_hex(path: &Path) -> SnapshotResult<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Xxh3::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:016x}", hasher.digest()))
}

/// Reader for snapshot archives
pub struct SnapshotArchiveReader;

impl SnapshotArchiveReader {
    /// List the file paths stored in an archive
    pub fn file_names(path: &Path) -> SnapshotResult<Vec<String>> {
        let mut archive = Self::open(path)?;
        let mut names = Vec::new();
        for entry in archive
            .entries()
            .map_err(|e| SnapshotError::archive_write(e.to_string()))?
        {
            let entry = entry.map_err(|e| SnapshotError::archive_write(e.to_string()))?;
            if entry.header().entry_type().is_file() {
                let name = entry
                    .path()
                    .map_err(|e| SnapshotError::archive_write(e.to_string()))?
                    .to_string_lossy()
                    .to_string();
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Read one file from an archive
    pub fn read_file(path: &Path, file_name: &str) -> SnapshotResult<Vec<u8>> {
        let mut archive = Self::open(path)?;
        for entry in archive
            .entries()
            .map_err(|e| SnapshotError::archive_write(e.to_string()))?
        {
            let mut entry = entry.map_err(|e| SnapshotError::archive_write(e.to_string()))?;
            let entry_path = entry
                .path()
                .map_err(|e| SnapshotError::archive_write(e.to_string()))?
                .to_string_lossy()
                .to_string();
            if entry_path == file_name {
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                return Ok(data);
            }
        }
        Err(SnapshotError::archive_write(format!(
            "'{}' not found in '{}'",
            file_name,
            path.display()
        )))
    }

    fn open(path: &Path) -> SnapshotResult<Archive<zstd::Decoder<'static, BufReader<File>>>> {
        let file = File::open(path)?;
        let decoder = zstd::Decoder::new(file)
            .map_err(|e| SnapshotError::archive_write(format!("zstd decode: {}", e)))?;
        Ok(Archive::new(decoder))
    }
}
