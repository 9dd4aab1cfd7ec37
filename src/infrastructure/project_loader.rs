use cargo_metadata::MetadataCommand;
use std::fs;
use std::path::{Component, Path, PathBuf};
use anyhow::{Context, Result};

/// One source file to be dumped as its own translation unit.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path as it should appear in locations.
    pub path: String,
    pub crate_name: Option<String>,
    /// Module path of the file inside its crate (`["geo", "point"]` for `src/geo/point.rs`).
    pub module_path: Vec<String>,
    /// Where the dump goes below an output directory, without the `.ast` suffix.
    pub relative: PathBuf,
    pub source: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        let path = path.into();
        let relative = output_relative(Path::new(&path));
        Self {
            path,
            crate_name: None,
            module_path: Vec::new(),
            relative,
            source: source.into(),
        }
    }

    pub fn with_crate(mut self, name: impl Into<String>) -> Self {
        self.crate_name = Some(name.into());
        self
    }

    pub fn with_module_path(mut self, module_path: Vec<String>) -> Self {
        self.module_path = module_path;
        self
    }

    /// Read a loose file given on the command line.
    pub fn read(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), source))
    }
}

pub struct ProjectLoader;

impl ProjectLoader {
    /// Load every source file of every workspace member as a translation unit.
    pub fn load_workspace(manifest_path: &Path) -> Result<Vec<SourceUnit>> {
        let metadata = MetadataCommand::new()
            .manifest_path(manifest_path)
            .no_deps()
            .exec()
            .context("Failed to execute cargo metadata")?;

        let mut units = Vec::new();

        for package_id in &metadata.workspace_members {
            let Some(package) = metadata.packages.iter().find(|p| &p.id == package_id) else {
                continue;
            };
            let crate_name = package.name.replace('-', "_");

            let roots: Vec<&Path> = package
                .targets
                .iter()
                .filter(|t| t.kind.iter().any(|k| k == "lib" || k == "bin" || k == "proc-macro"))
                .map(|t| t.src_path.as_std_path())
                .collect();

            // lib and bin targets sharing one src/ directory reach the same files
            let mut files = Vec::new();
            for root in &roots {
                Self::collect_rs_recursive(src_dir_of(root), &mut files)?;
            }
            files.sort();
            files.dedup();

            let package_src = package.manifest_path.as_std_path().parent().map(|dir| dir.join("src"));

            for file in files {
                let Some(owner) = owning_target(&file, &roots) else {
                    continue;
                };
                let source = fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read file {}", file.display()))?;
                let relative_to_owner = file.strip_prefix(src_dir_of(owner)).unwrap_or(&file);
                let module_path = if file == owner {
                    Vec::new()
                } else {
                    module_path_of(relative_to_owner)
                };
                let relative_to_src = package_src
                    .as_deref()
                    .and_then(|src| file.strip_prefix(src).ok())
                    .unwrap_or(relative_to_owner);

                let mut unit = SourceUnit::new(file.display().to_string(), source)
                    .with_crate(crate_name.clone())
                    .with_module_path(module_path);
                unit.relative = Path::new(&crate_name).join(relative_to_src);
                units.push(unit);
            }
        }

        units.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::debug!(units = units.len(), manifest = %manifest_path.display(), "loaded workspace");
        Ok(units)
    }

    fn collect_rs_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        if dir.ends_with("target") || dir.ends_with(".git") || !dir.exists() {
            return Ok(());
        }

        if dir.is_file() {
            if dir.extension().is_some_and(|ext| ext == "rs") {
                out.push(dir.to_path_buf());
            }
            return Ok(());
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                Self::collect_rs_recursive(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                out.push(path);
            }
        }
        Ok(())
    }
}

/// The input path without its root, `.` and `..` parts, so distinct inputs keep
/// distinct dump locations below an output directory.
fn output_relative(path: &Path) -> PathBuf {
    let relative: PathBuf = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if relative.as_os_str().is_empty() {
        PathBuf::from("unit.rs")
    } else {
        relative
    }
}

fn src_dir_of(root: &Path) -> &Path {
    root.parent().unwrap_or(root)
}

/// The target a file belongs to: the one whose crate root it is, otherwise the
/// one with the innermost source directory holding it.
fn owning_target<'t>(file: &Path, roots: &[&'t Path]) -> Option<&'t Path> {
    roots.iter().copied().find(|root| *root == file).or_else(|| {
        roots
            .iter()
            .copied()
            .filter(|root| file.starts_with(src_dir_of(root)))
            .max_by_key(|root| src_dir_of(root).components().count())
    })
}

/// Module path of a non-root file below its target's source directory:
/// `geo/point.rs` -> `["geo", "point"]`, `geo/mod.rs` -> `["geo"]`.
fn module_path_of(relative: &Path) -> Vec<String> {
    let mut segments: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.last().is_some_and(|last| last == "mod") {
        segments.pop();
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_path_of() {
        assert_eq!(module_path_of(Path::new("geo/point.rs")), vec!["geo", "point"]);
        assert_eq!(module_path_of(Path::new("geo/mod.rs")), vec!["geo"]);
        assert_eq!(module_path_of(Path::new("geo/main.rs")), vec!["geo", "main"]);
        assert_eq!(module_path_of(Path::new("geo/lib.rs")), vec!["geo", "lib"]);
    }

    #[test]
    fn test_bin_files_belong_to_their_own_target() {
        let lib = Path::new("/ws/geometry/src/lib.rs");
        let main = Path::new("/ws/geometry/src/main.rs");
        let tool = Path::new("/ws/geometry/src/bin/tool.rs");
        let roots = [lib, main, tool];

        assert_eq!(owning_target(tool, &roots), Some(tool));
        assert_eq!(owning_target(main, &roots), Some(main));
        assert_eq!(
            owning_target(Path::new("/ws/geometry/src/bin/helper.rs"), &roots),
            Some(tool)
        );
        let point = Path::new("/ws/geometry/src/geo/point.rs");
        assert_eq!(owning_target(point, &roots[..1]), Some(lib));
        assert_eq!(owning_target(Path::new("/ws/other/x.rs"), &roots), None);
    }

    #[test]
    fn test_loose_unit_relative_keeps_directories() {
        let unit = SourceUnit::new("some/dir/input.rs", "fn main() {}");
        assert_eq!(unit.relative, Path::new("some").join("dir").join("input.rs"));
        assert!(unit.crate_name.is_none());

        let a = SourceUnit::new("a/lib.rs", "");
        let b = SourceUnit::new("b/lib.rs", "");
        assert_ne!(a.relative, b.relative);
        assert_eq!(SourceUnit::new("./../x/lib.rs", "").relative, Path::new("x").join("lib.rs"));
    }

    #[test]
    fn test_read_missing_file_is_an_error() {
        let err = SourceUnit::read(Path::new("/definitely/not/here.rs")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
