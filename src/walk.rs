use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use regex::Regex;
use tracing::{debug, error};

/// Walks `base` and returns the first path whose full text matches
/// `pattern`. The walk is physical (symlinks are neither followed nor
/// matched) and visits files in directory order, directories after their
/// contents. Which match wins when several paths qualify is whatever the
/// host filesystem enumerates first; callers must not rely on more than
/// that. `None` when nothing matches or `base` cannot be opened.
pub fn find_first(base: &Path, pattern: &Regex) -> Option<PathBuf> {
    let mut found = None;
    visit(base, pattern, &mut |path| {
        found = Some(path.to_path_buf());
        true
    });
    found
}

/// Same walk as [`find_first`], collecting up to `max` matches. Matches past
/// the cap are silently dropped. An empty result is success: the base was
/// walked and nothing qualified.
pub fn find_all(base: &Path, pattern: &Regex, max: usize) -> Vec<PathBuf> {
    let mut matches = Vec::new();
    if max == 0 {
        return matches;
    }
    visit(base, pattern, &mut |path| {
        matches.push(path.to_path_buf());
        matches.len() >= max
    });
    matches
}

/// Depth-first walk of `dir`. `on_match` returns true to stop the walk;
/// `visit` reports whether it was stopped. Unreadable directories are
/// skipped; a hard error from entry iteration is fatal, since it means the
/// process can no longer trust filesystem enumeration at all.
fn visit(dir: &Path, pattern: &Regex, on_match: &mut dyn FnMut(&Path) -> bool) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), %err, "skipping unreadable directory");
            return false;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                error!(dir = %dir.display(), %err, "directory walk failed");
                process::exit(1);
            }
        };
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if visit(&path, pattern, on_match) {
                return true;
            }
            if matches(pattern, &path) && on_match(&path) {
                return true;
            }
        } else if file_type.is_file() && matches(pattern, &path) && on_match(&path) {
            return true;
        }
    }

    false
}

fn matches(pattern: &Regex, path: &Path) -> bool {
    path.to_str().is_some_and(|text| pattern.is_match(text))
}
