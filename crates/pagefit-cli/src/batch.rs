//! Finding inputs and naming outputs for a directory run.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// One input and where its PDF ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Every convertible file under `root`, sorted. `skip` (typically the output
/// directory) is not descended into.
pub fn collect_inputs(root: &Path, skip: Option<&Path>) -> io::Result<Vec<PathBuf>> {
    let skip = skip.and_then(|p| p.canonicalize().ok());
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if skip.is_some() && path.canonicalize().ok() == skip {
                    continue;
                }
                pending.push(path);
            } else if pagefit::is_supported(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Output paths for `inputs`, mirroring their location under `input_root`
/// unless `flatten`. Clashing names get ` (1)`, ` (2)`, ... before `.pdf`.
pub fn plan(input_root: &Path, inputs: &[PathBuf], output_root: &Path, flatten: bool) -> Vec<Job> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let dir = if flatten {
                output_root.to_path_buf()
            } else {
                let relative_parent = input
                    .strip_prefix(input_root)
                    .ok()
                    .and_then(Path::parent)
                    .unwrap_or_else(|| Path::new(""));
                output_root.join(relative_parent)
            };
            let output = unique_name(&dir, &stem, &mut taken);
            Job {
                input: input.clone(),
                output,
            }
        })
        .collect()
}

fn unique_name(dir: &Path, stem: &str, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}.pdf"));
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        candidate = dir.join(format!("{stem} ({n}).pdf"));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_collect_inputs_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.xlsx"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub/a.PNG"));
        touch(&root.join("sub/deeper/c.pdf"));
        touch(&root.join("out/old.pdf"));

        let found = collect_inputs(root, Some(&root.join("out"))).unwrap();
        assert_eq!(
            found,
            vec![
                root.join("b.xlsx"),
                root.join("sub/a.PNG"),
                root.join("sub/deeper/c.pdf"),
            ]
        );
    }

    #[test]
    fn test_plan_mirrors_directories() {
        let inputs = vec![
            PathBuf::from("in/q1/report.xlsx"),
            PathBuf::from("in/scan.png"),
        ];
        let jobs = plan(Path::new("in"), &inputs, Path::new("out"), false);
        assert_eq!(jobs[0].output, PathBuf::from("out/q1/report.pdf"));
        assert_eq!(jobs[1].output, PathBuf::from("out/scan.pdf"));
    }

    #[test]
    fn test_plan_flatten_deduplicates() {
        let inputs = vec![
            PathBuf::from("in/a/report.xlsx"),
            PathBuf::from("in/b/report.xlsx"),
            PathBuf::from("in/report.docx"),
            PathBuf::from("in/summary.pdf"),
        ];
        let outputs: Vec<_> = plan(Path::new("in"), &inputs, Path::new("out"), true)
            .into_iter()
            .map(|job| job.output)
            .collect();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("out/report.pdf"),
                PathBuf::from("out/report (1).pdf"),
                PathBuf::from("out/report (2).pdf"),
                PathBuf::from("out/summary.pdf"),
            ]
        );
    }

    #[test]
    fn test_plan_mirrored_name_clash_in_one_directory() {
        let inputs = vec![PathBuf::from("in/memo.docx"), PathBuf::from("in/memo.pdf")];
        let jobs = plan(Path::new("in"), &inputs, Path::new("out"), false);
        assert_eq!(jobs[0].output, PathBuf::from("out/memo.pdf"));
        assert_eq!(jobs[1].output, PathBuf::from("out/memo (1).pdf"));
    }
}
