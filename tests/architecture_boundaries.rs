use std::fs;
use std::path::{Path, PathBuf};

fn rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

fn rel(path: &Path) -> String {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let rel = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string();
    rel.replace('\\', "/")
}

#[test]
fn toolkit_modules_know_nothing_about_metrics() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut violations = Vec::new();

    for file in [root.join("text.rs"), root.join("walk.rs")] {
        let content = fs::read_to_string(&file).unwrap_or_default();
        for forbidden in ["crate::probe", "crate::render", "/proc", "sysctl"] {
            if content.contains(forbidden) {
                violations.push(format!(
                    "{} references forbidden dependency `{}`",
                    rel(&file),
                    forbidden
                ));
            }
        }
    }

    assert!(violations.is_empty(), "{}", violations.join("\n"));
}

#[test]
fn probe_modules_do_not_reach_into_presentation() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/probe");
    let mut violations = Vec::new();

    for file in rs_files(&root) {
        let content = fs::read_to_string(&file).unwrap_or_default();
        for forbidden in ["crate::render", "clap", "println!"] {
            if content.contains(forbidden) {
                violations.push(format!(
                    "{} references forbidden dependency `{}`",
                    rel(&file),
                    forbidden
                ));
            }
        }
    }

    assert!(violations.is_empty(), "{}", violations.join("\n"));
}

#[test]
fn platform_branching_stays_behind_the_source_modules() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let platform = src.join("probe/platform");
    let mut violations = Vec::new();

    for file in rs_files(&src) {
        if file.starts_with(&platform) {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        if content.contains("target_os") {
            violations.push(format!("{} branches on target_os", rel(&file)));
        }
    }

    assert!(violations.is_empty(), "{}", violations.join("\n"));
}
