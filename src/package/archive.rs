//! Reproducible `.tar.gz` bundles.
//!
//! Members are sorted by path and carry zero mtime/uid/gid with fixed modes (scripts 0755);
//! the gzip header has no timestamp or file name. Unchanged input therefore
//! yields byte-identical archives.
use crate::fsutil::write_bytes;
use crate::util::sha256_hex;
use anyhow::{Context, Result};
use flate2::{Compression, GzBuilder};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const EXECUTABLE_SUFFIX: &str = ".sh";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArchiveDigest {
    pub path: PathBuf,
    pub sha256: String,
    pub members: usize,
}

/// Archive `files` (all under `base`) into `archive_path`, naming members
/// by their path relative to `base`.
pub fn write_archive(
    archive_path: &Path,
    base: &Path,
    files: &[PathBuf],
) -> Result<ArchiveDigest> {
    let mut members = Vec::with_capacity(files.len());
    for file in files {
        let rel = file
            .strip_prefix(base)
            .with_context(|| format!("{} is outside {}", file.display(), base.display()))?;
        let name = rel
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        members.push((name, file));
    }
    members.sort();

    let encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, file) in &members {
        let data = fs::read(file).with_context(|| format!("read {}", file.display()))?;
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(if name.ends_with(EXECUTABLE_SUFFIX) {
            0o755
        } else {
            0o644
        });
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        builder
            .append_data(&mut header, name, data.as_slice())
            .with_context(|| format!("append {name} to {}", archive_path.display()))?;
    }
    let encoder = builder
        .into_inner()
        .with_context(|| format!("finish tar stream {}", archive_path.display()))?;
    let bytes = encoder
        .finish()
        .with_context(|| format!("finish gzip stream {}", archive_path.display()))?;
    write_bytes(archive_path, &bytes)?;

    Ok(ArchiveDigest {
        path: archive_path.to_path_buf(),
        sha256: sha256_hex(&bytes),
        members: members.len(),
    })
}
