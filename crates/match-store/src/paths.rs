/// Normalizes a declared source path into one safe to join under a
/// contract's `sources/` directory: separators unified to `/`, `\n` stripped,
/// `.`/empty segments collapsed, and any `..` segment simply dropped rather
/// than rejected outright (spec calls for "drop", not "fail the whole
/// upload" — a path that only escapes via `..` still has a usable tail).
///
/// Returns `(sanitized, changed)`; `changed` is false iff `sanitized` is
/// byte-for-byte identical to `path`, which is exactly when no
/// `path-translation.json` entry is needed for this path.
pub fn sanitize_source_path(path: &str) -> (String, bool) {
    let normalized = path.replace('\\', "/").replace('\n', "");
    let segments: Vec<&str> = normalized
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect();
    let sanitized = segments.join("/");
    let changed = sanitized != path;
    (sanitized, changed)
}
