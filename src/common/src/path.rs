//! Helpers for the absolute, `/`-separated paths that identify stored nodes.

/// Returns the path of the parent node, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" || path.is_empty() {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&trimmed[..i]),
        None => None,
    }
}

/// Returns the last segment of `path`; the root's name is empty.
pub fn name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Returns the name without its namespace prefix.
pub fn local_name(path: &str) -> &str {
    let name = name(path);
    match name.find(':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// Number of segments in `path`; the root has depth 0.
pub fn depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// True if `path` is strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return path != "/" && path.starts_with('/');
    }
    let ancestor = ancestor.trim_end_matches('/');
    path.len() > ancestor.len() + 1
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// Resolves `relative` against `base`, handling `.` and `..` segments.
pub fn resolve(base: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = if relative.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}
