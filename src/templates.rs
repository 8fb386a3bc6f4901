//! Template lookup: path validation, parameter descriptors and mixin resolution.

use crate::error::{InitializerError, Result};
use lazy_regex::regex_is_match;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the per-template file listing sibling directories to merge in.
pub const MIXINS_FILE: &str = "mixins.json";

/// Name of the per-template file describing its accepted parameters.
pub const PARAMETERS_FILE: &str = "parameters.json";

/// Subdirectory of a template that holds the files to archive.
pub const FILES_DIR: &str = "files";

/// Trim surrounding slashes from `path` and check it against the allow-list.
///
/// Only lowercase segments matching `[a-z][a-z0-9-]*` joined by `/` pass, so
/// the result can never climb out of the templates root.
pub fn validate_template_path(path: &str) -> Result<String> {
    let path = path.trim_start_matches('/').trim_end_matches('/');
    if regex_is_match!(r"^[a-z][a-z0-9\-]*(/[a-z][a-z0-9\-]*)*$", path) {
        Ok(path.to_string())
    } else {
        Err(InitializerError::TemplateNotFound(path.to_string()))
    }
}

fn is_valid_segment(name: &str) -> bool {
    regex_is_match!(r"^[a-z][a-z0-9\-]*$", name)
}

/// Final segment of a validated template path, used to name the download.
pub fn leaf_name(template: &str) -> &str {
    template.rsplit('/').next().unwrap_or(template)
}

/// Templates stored as directories under a common root.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TemplateStore { root: root.into() }
    }

    /// Root directory of all templates.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the template at `path`, which must already be validated.
    fn template_dir(&self, path: &str) -> Result<PathBuf> {
        let dir = self.root.join(path);
        if !dir.is_dir() {
            return Err(InitializerError::TemplateNotFound(path.to_string()));
        }
        Ok(dir)
    }

    /// Parameter descriptor of a template, `{"sections": []}` if it declares none.
    pub fn parameters(&self, path: &str) -> Result<Value> {
        let path = validate_template_path(path)?;
        let params = self.template_dir(&path)?.join(PARAMETERS_FILE);
        if !params.is_file() {
            return Ok(serde_json::json!({ "sections": [] }));
        }
        read_json(&params)
    }

    /// Ordered directories whose files make up the archive for `path`.
    ///
    /// The template's own `files` directory comes first, followed by the
    /// `files` directory of every mixin in `mixins.json` order. Mixins are
    /// resolved as siblings of the template directory.
    pub fn directory_set(&self, path: &str) -> Result<Vec<PathBuf>> {
        let path = validate_template_path(path)?;
        let dir = self.template_dir(&path)?;

        let mut dirs = vec![dir.join(FILES_DIR)];

        let mixins_file = dir.join(MIXINS_FILE);
        if mixins_file.is_file() {
            let mixins: Vec<String> = serde_json::from_value(read_json(&mixins_file)?)?;
            let mixins_root = dir.parent().unwrap_or(&self.root);
            for mixin in mixins {
                if !is_valid_segment(&mixin) {
                    return Err(InitializerError::NotFound(format!(
                        "invalid mixin {:?} in {}",
                        mixin, path
                    )));
                }
                debug!(template = %path, mixin = %mixin, "adding mixin");
                dirs.push(mixins_root.join(mixin).join(FILES_DIR));
            }
        }

        for dir in &dirs {
            if !dir.is_dir() {
                return Err(InitializerError::NotFound(dir.display().to_string()));
            }
        }

        Ok(dirs)
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => InitializerError::NotFound(path.display().to_string()),
        _ => InitializerError::Io(e),
    })?;
    Ok(serde_json::from_slice(&content)?)
}
