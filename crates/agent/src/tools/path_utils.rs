//! Path resolution confined to the review root

use std::path::{Component, Path, PathBuf};

use super::ToolError;

/// Lexically normalize a path: drop `.` segments and fold `..` into its parent.
///
/// Does not touch the filesystem. A `..` at the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_anchor = matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if at_anchor {
                    if normalized.as_os_str().is_empty() {
                        normalized.push("..");
                    }
                } else if normalized.ends_with("..") {
                    normalized.push("..");
                } else {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolve a tool-supplied path against `root` and reject anything outside it.
///
/// Relative paths are joined to the root. Existing paths are canonicalized so
/// symlinks cannot escape; for a missing path the parent is canonicalized
/// instead.
pub async fn resolve_within_root(raw: &str, root: &Path) -> Result<PathBuf, ToolError> {
    let candidate = Path::new(raw);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let normalized = normalize_path(&joined);

    let resolved = match tokio::fs::canonicalize(&normalized).await {
        Ok(path) => path,
        Err(_) => match (normalized.parent(), normalized.file_name()) {
            (Some(parent), Some(name)) => tokio::fs::canonicalize(parent)
                .await
                .map(|p| p.join(name))
                .unwrap_or_else(|_| normalized.clone()),
            _ => normalized.clone(),
        },
    };

    let canonical_root = tokio::fs::canonicalize(root)
        .await
        .unwrap_or_else(|_| normalize_path(root));

    if !is_path_within_root(&resolved, &canonical_root) {
        return Err(ToolError::OutsideRoot {
            path: raw.to_string(),
            root: canonical_root.display().to_string(),
        });
    }

    Ok(resolved)
}

/// Component-wise prefix check
pub fn is_path_within_root(path: &Path, root: &Path) -> bool {
    let mut path_components = path.components();
    root.components()
        .all(|root_comp| path_components.next() == Some(root_comp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("a/b/../../..")), PathBuf::from(".."));
        assert_eq!(normalize_path(Path::new("../../a")), PathBuf::from("../../a"));
        assert_eq!(normalize_path(Path::new("src//app.js")), PathBuf::from("src/app.js"));
    }

    #[test]
    fn test_is_path_within_root() {
        let root = Path::new("/home/user/project");

        assert!(is_path_within_root(Path::new("/home/user/project/a.js"), root));
        assert!(is_path_within_root(Path::new("/home/user/project/src/b.ts"), root));
        assert!(is_path_within_root(root, root));

        assert!(!is_path_within_root(Path::new("/home/user/other/a.js"), root));
        assert!(!is_path_within_root(Path::new("/home/user/project2/a.js"), root));
        assert!(!is_path_within_root(Path::new("/home/user"), root));
    }

    #[tokio::test]
    async fn test_resolve_relative_inside() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "x").unwrap();

        let resolved = resolve_within_root("a.js", dir.path()).await.unwrap();
        assert_eq!(resolved, dir.path().join("a.js").canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("project");
        fs::create_dir(&root).unwrap();
        fs::write(dir.path().join("secret.js"), "x").unwrap();

        let result = resolve_within_root("../secret.js", &root).await;
        assert!(matches!(result, Err(ToolError::OutsideRoot { .. })));
    }

    #[tokio::test]
    async fn test_resolve_missing_file_inside() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_within_root("new.js", dir.path()).await.unwrap();
        assert!(resolved.ends_with("new.js"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_symlink_escape_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("project");
        fs::create_dir(&root).unwrap();
        let outside = dir.path().join("outside.js");
        fs::write(&outside, "x").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link.js")).unwrap();

        let result = resolve_within_root("link.js", &root).await;
        assert!(matches!(result, Err(ToolError::OutsideRoot { .. })));
    }
}
