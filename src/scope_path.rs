pub fn normalize(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }
    normalized
}

pub fn is_within_root(path: &str, root: &str) -> bool {
    let path = normalize(path);
    let root = normalize(root);

    if path == root {
        return true;
    }

    if root == "/" {
        return path.starts_with('/');
    }

    if cfg!(windows) {
        let path_lower = path.to_ascii_lowercase();
        let root_lower = root.to_ascii_lowercase();
        return path_lower.starts_with(&(root_lower + "/"));
    }

    path.starts_with(&(root + "/"))
}

/// Final segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Byte offset just past the first occurrence of `fragment` in `path` where
/// the fragment starts and ends on segment boundaries.
pub fn find_segments(path: &str, fragment: &str) -> Option<usize> {
    let fragment = fragment.trim_matches('/');
    if fragment.is_empty() {
        return None;
    }

    let mut search_from = 0;
    while let Some(found) = path[search_from..].find(fragment) {
        let start = search_from + found;
        let end = start + fragment.len();
        let starts_on_boundary = start == 0 || path.as_bytes()[start - 1] == b'/';
        let ends_on_boundary = end == path.len() || path.as_bytes()[end] == b'/';
        if starts_on_boundary && ends_on_boundary {
            return Some(end);
        }
        search_from = start + 1;
        while !path.is_char_boundary(search_from) {
            search_from += 1;
        }
    }
    None
}
