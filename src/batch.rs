//! Batch planning: which files to optimize and where each result goes.
//!
//! Results are named `<stem>-<slug>.jpg`, next to the source or in an
//! output directory. Planning happens before any file is written so that a
//! batch never overwrites its own inputs or one of its own results:
//!
//! ```text
//! a.jpg        → a-email.jpg
//! a-email.jpg  → a-email-email.jpg
//! x/a.jpg      → out/a-email.jpg
//! y/a.jpg      ✗ out/a-email.jpg is already written by x/a.jpg
//! ```
//!
//! When a directory is walked, a file that is exactly the result another
//! file in the walk would produce is an earlier run's output, not a photo to
//! process. It is left out and will be replaced.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Why an input has no output path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("output {} would overwrite an input", .0.display())]
    OverwritesInput(PathBuf),
    #[error("output {} is already written by {}", .target.display(), .claimed_by.display())]
    AlreadyClaimed { target: PathBuf, claimed_by: PathBuf },
}

/// One input and where its result will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub target: Result<PathBuf, PlanError>,
}

pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

/// `<stem>-<slug>.jpg`, in `out_dir` or next to the source.
pub fn output_path(source: &Path, out_dir: Option<&Path>, slug: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    dir.join(format!("{}-{}.jpg", stem, slug))
}

/// Absolute form for comparing paths that may not exist yet.
fn normalized(path: &Path) -> PathBuf {
    if let Ok(existing) = path.canonicalize() {
        return existing;
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

/// Expand directories into the JPEG files below them, in path order.
///
/// Files named on the command line are always kept. Inside a directory,
/// earlier results for this destination are dropped.
pub fn collect_inputs(inputs: &[PathBuf], out_dir: Option<&Path>, slug: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        let found: Vec<PathBuf> = WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_jpeg(e.path()))
            .map(|e| e.into_path())
            .collect();
        let present: HashSet<PathBuf> = found.iter().map(|p| normalized(p)).collect();
        let previous: HashSet<PathBuf> = found
            .iter()
            .map(|p| normalized(&output_path(p, out_dir, slug)))
            .filter(|target| present.contains(target))
            .collect();

        for path in found {
            if previous.contains(&normalized(&path)) {
                tracing::debug!("skipping earlier output {}", path.display());
            } else {
                files.push(path);
            }
        }
    }
    files
}

/// Assign every input its output path, refusing targets that are inputs
/// themselves or were already given to an earlier input.
pub fn plan_outputs(files: Vec<PathBuf>, out_dir: Option<&Path>, slug: &str) -> Vec<PlannedFile> {
    let inputs: HashSet<PathBuf> = files.iter().map(|p| normalized(p)).collect();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    files
        .into_iter()
        .map(|source| {
            let target = output_path(&source, out_dir, slug);
            let key = normalized(&target);
            let target = if inputs.contains(&key) {
                Err(PlanError::OverwritesInput(target))
            } else if let Some(first) = claimed.get(&key) {
                Err(PlanError::AlreadyClaimed {
                    target,
                    claimed_by: first.clone(),
                })
            } else {
                claimed.insert(key, source.clone());
                Ok(target)
            };
            PlannedFile { source, target }
        })
        .collect()
}
