//! Streaming ZIP archiver for template directories.
//!
//! Archiving happens in two passes. [`plan`] walks every source directory
//! and decides which file supplies each entry name; it touches no file
//! contents, so problems with the directory set surface before any output.
//! [`write_archive`] then renders or copies the planned files one entry at a
//! time into a ZIP stream.

use crate::error::{InitializerError, Result};
use crate::escape::{classify_path, escaper_for};
use crate::permissions::{permissions, RWXR_XR_X};
use crate::render::{context_for, render_file};
use crate::scope::Scope;
use std::collections::{HashMap, HashSet};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Package path embedded in template sources, rewritten per request.
pub const PLACEHOLDER_PACKAGE_PATH: &str = "com/example/demo";

/// One file to be written into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Name inside the archive, after package remapping
    pub name: String,
    /// Source directory the file was found under
    pub source_root: PathBuf,
    /// Path of the file relative to `source_root`, `/`-separated
    pub relative: String,
}

impl ArchiveEntry {
    /// Full path of the source file.
    pub fn source_path(&self) -> PathBuf {
        self.source_root.join(&self.relative)
    }
}

/// How to translate template files into archive entries.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Path segment sequence to replace in entry names
    pub placeholder: String,
    /// Replacement for `placeholder`, e.g. `org/acme/app`
    pub package_path: String,
    /// Classification keys of files that get placeholder substitution
    pub process_extensions: HashSet<String>,
}

/// Rewrite the placeholder package path inside an entry name.
pub fn remap_entry_name(relative: &str, placeholder: &str, package_path: &str) -> String {
    relative.replace(placeholder, package_path)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

fn is_source_file(dir_entry: &walkdir::DirEntry, canonical_root: &Path) -> bool {
    let file_type = dir_entry.file_type();
    if file_type.is_file() {
        return true;
    }
    if !file_type.is_symlink() {
        return false;
    }
    match dir_entry.path().canonicalize() {
        Ok(target) if target.starts_with(canonical_root) && target.is_file() => true,
        _ => {
            debug!(path = %dir_entry.path().display(), "skipping link outside template");
            false
        }
    }
}

/// Collect the entries for `dirs`, in walk order within each directory and
/// directory order across the set.
///
/// When several directories provide the same entry name, the last one wins
/// and the entry keeps the position where the name first appeared. Every
/// regular file becomes an entry, and so does a symbolic link whose target
/// is a regular file inside the same source directory. Other links are
/// skipped and directories behind links are never walked.
pub fn plan(dirs: &[PathBuf], options: &ArchiveOptions) -> Result<Vec<ArchiveEntry>> {
    let mut entries: Vec<ArchiveEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for root in dirs {
        if !root.is_dir() {
            return Err(InitializerError::NotFound(root.display().to_string()));
        }
        let canonical_root = root.canonicalize()?;

        for dir_entry in WalkDir::new(root).sort_by_file_name() {
            let dir_entry = dir_entry?;
            if !is_source_file(&dir_entry, &canonical_root) {
                continue;
            }
            let Some(relative) = relative_name(root, dir_entry.path()) else {
                continue;
            };
            let entry = ArchiveEntry {
                name: remap_entry_name(&relative, &options.placeholder, &options.package_path),
                source_root: root.clone(),
                relative,
            };

            match positions.get(&entry.name) {
                Some(&index) => {
                    debug!(entry = %entry.name, source = %root.display(), "overriding entry");
                    entries[index] = entry;
                }
                None => {
                    positions.insert(entry.name.clone(), entries.len());
                    entries.push(entry);
                }
            }
        }
    }

    Ok(entries)
}

fn write_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    entry: &ArchiveEntry,
    options: &ArchiveOptions,
    context: &tera::Context,
) -> Result<()> {
    let source = entry.source_path();

    let mut file_options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    // Only the owner-execute bit is carried over.
    if permissions(&source).is_some_and(|p| p.is_executable()) {
        file_options = file_options.unix_permissions(RWXR_XR_X);
    }

    zip.start_file(entry.name.as_str(), file_options)?;

    let key = classify_path(&source);
    if options.process_extensions.contains(&key) {
        render_file(
            &entry.source_root,
            &entry.relative,
            context,
            escaper_for(&key),
            &mut *zip,
        )?;
    } else {
        let mut file = std::fs::File::open(&source)?;
        std::io::copy(&mut file, zip)?;
    }

    Ok(())
}

/// Write `entries` as a ZIP stream into `out`.
///
/// Each entry is finished before the next one starts, so memory use does not
/// grow with the archive. The stream is finalised even when an entry fails;
/// the first error is returned and the output must be treated as truncated.
pub fn write_archive<W: Write>(
    entries: &[ArchiveEntry],
    options: &ArchiveOptions,
    scope: &Scope,
    out: W,
) -> Result<()> {
    let context = context_for(scope);
    let mut zip = ZipWriter::new_stream(out);

    let written = entries
        .iter()
        .try_for_each(|entry| write_entry(&mut zip, entry, options, &context));
    let finished = zip.finish();

    written?;
    let mut inner = finished?;
    inner.flush()?;

    info!(entries = entries.len(), "archive written");
    Ok(())
}
