//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Expand a leading `~` to the current user's home directory.
///
/// Only the bare `~` and `~/...` forms are expanded; `~user/...` is left as-is.
/// When no home directory can be determined the path is returned unchanged.
pub fn expand_user(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Resolve a scan root: expand `~`, make absolute against CWD, and normalize
/// `.`/`..` components syntactically.
///
/// Symlinks are deliberately not resolved, so entry locations keep the
/// spelling of the configured root.
pub fn resolve_root(path: &Path) -> PathBuf {
    let expanded = expand_user(path);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        env::current_dir().map_or_else(|_| expanded.clone(), |cwd| cwd.join(&expanded))
    };
    normalize_syntactic(&absolute)
}

/// Number of segments in `path`, counting the root (`/`) as one segment.
///
/// `/tmp/x` has depth 3 and `/tmp/x/a.avi` has depth 4. Depth is always
/// measured from the filesystem root, never relative to a scan root.
pub fn path_depth(path: &Path) -> usize {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .count()
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_bare_tilde_and_subpaths() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_user(Path::new("~")), home);
        assert_eq!(
            expand_user(Path::new("~/movies")),
            home.join("movies")
        );
    }

    #[test]
    fn leaves_other_paths_alone() {
        assert_eq!(
            expand_user(Path::new("/storage/tv")),
            PathBuf::from("/storage/tv")
        );
        assert_eq!(
            expand_user(Path::new("~other/tv")),
            PathBuf::from("~other/tv")
        );
    }

    #[cfg(unix)]
    #[test]
    fn depth_counts_root_as_a_segment() {
        assert_eq!(path_depth(Path::new("/")), 1);
        assert_eq!(path_depth(Path::new("/tmp/x")), 3);
        assert_eq!(path_depth(Path::new("/tmp/x/")), 3);
        assert_eq!(path_depth(Path::new("/tmp/x/a.avi")), 4);
    }

    #[cfg(unix)]
    #[test]
    fn resolve_root_normalizes_dots() {
        assert_eq!(
            resolve_root(Path::new("/nonexistent/foo/../bar/./baz")),
            PathBuf::from("/nonexistent/bar/baz")
        );
        assert_eq!(resolve_root(Path::new("/../foo")), PathBuf::from("/foo"));
    }

    #[test]
    fn resolve_root_makes_relative_paths_absolute() {
        let cwd = env::current_dir().unwrap();
        let resolved = resolve_root(Path::new("some/relative"));
        assert!(resolved.is_absolute());
        assert!(resolved.starts_with(normalize_syntactic(&cwd)));
        assert!(resolved.ends_with("some/relative"));
    }
}
