//! Namespace derivation from type and resource names.
//!
//! Type names are dot-segmented (`pkg.sub.Thing`); resource names are
//! slash-segmented paths (`pkg/sub/data.bin`). Both derive the same
//! dot-separated namespace form: the longest proper prefix ending at the
//! last separator. Names without a separator belong to the distinguished
//! default namespace.

/// The default (unnamed) namespace sentinel.
pub const DEFAULT_NAMESPACE: &str = ".";

/// Derive the namespace of a dot-segmented type name.
///
/// `"pkg.sub.Thing"` → `"pkg.sub"`; a name with no enclosing namespace
/// (including a leading-dot name) maps to [`DEFAULT_NAMESPACE`].
#[inline]
pub fn type_namespace(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => DEFAULT_NAMESPACE,
    }
}

/// Derive the namespace of a slash-segmented resource name.
///
/// One leading slash is ignored; the directory prefix is converted to dot
/// form: `"/pkg/sub/data.bin"` → `"pkg.sub"`. Resources at the top level
/// map to [`DEFAULT_NAMESPACE`].
pub fn resource_namespace(name: &str) -> String {
    let begin = if name.len() > 1 && name.starts_with('/') { 1 } else { 0 };
    match name.rfind('/') {
        Some(end) if end > begin => name[begin..end].replace('/', "."),
        _ => DEFAULT_NAMESPACE.to_string(),
    }
}

/// True if `child` lies strictly below `parent`.
///
/// The default namespace is the root: everything is under it.
pub fn is_sub_namespace(parent: &str, child: &str) -> bool {
    if parent.is_empty() || parent == DEFAULT_NAMESPACE {
        return true;
    }
    match child.strip_prefix(parent) {
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

/// Convert a dot-form namespace back to a resource path prefix.
#[inline]
pub fn namespace_to_path(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        String::new()
    } else {
        namespace.replace('.', "/")
    }
}

/// Match a file name against a `*` wildcard pattern.
///
/// Only `*` is special (zero or more characters). A `None`-like blanket is
/// expressed by the pattern `"*"`.
pub fn wildcard_match(name: &str, pattern: &str) -> bool {
    let mut segments = pattern.split('*');
    let first = segments.next().unwrap_or("");
    if !name.starts_with(first) {
        return false;
    }
    let mut rest = &name[first.len()..];
    let mut last: Option<&str> = None;
    for segment in segments {
        last = Some(segment);
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }
    match last {
        // No '*' at all: the whole name must have been consumed.
        None => rest.is_empty(),
        Some(tail) => tail.is_empty() || rest.is_empty() || name.ends_with(tail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_namespace_nested() {
        assert_eq!(type_namespace("pkg.sub.Thing"), "pkg.sub");
        assert_eq!(type_namespace("pkg.Thing"), "pkg");
    }

    #[test]
    fn test_type_namespace_default() {
        assert_eq!(type_namespace("Thing"), DEFAULT_NAMESPACE);
        assert_eq!(type_namespace(".Thing"), DEFAULT_NAMESPACE);
        assert_eq!(type_namespace(""), DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_resource_namespace_nested() {
        assert_eq!(resource_namespace("pkg/sub/data.bin"), "pkg.sub");
        assert_eq!(resource_namespace("/pkg/sub/data.bin"), "pkg.sub");
    }

    #[test]
    fn test_resource_namespace_default() {
        assert_eq!(resource_namespace("data.bin"), DEFAULT_NAMESPACE);
        assert_eq!(resource_namespace("/data.bin"), DEFAULT_NAMESPACE);
        assert_eq!(resource_namespace("/"), DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_sub_namespace() {
        assert!(is_sub_namespace("pkg", "pkg.sub"));
        assert!(is_sub_namespace("pkg.sub", "pkg.sub.deep"));
        assert!(!is_sub_namespace("pkg", "pkg"));
        assert!(!is_sub_namespace("pkg", "pkgother.sub"));
        assert!(is_sub_namespace(DEFAULT_NAMESPACE, "anything.at.all"));
    }

    #[test]
    fn test_namespace_to_path() {
        assert_eq!(namespace_to_path("pkg.sub"), "pkg/sub");
        assert_eq!(namespace_to_path(DEFAULT_NAMESPACE), "");
    }

    #[test]
    fn test_wildcard_exact() {
        assert!(wildcard_match("data.bin", "data.bin"));
        assert!(!wildcard_match("data.bin", "data.txt"));
    }

    #[test]
    fn test_wildcard_blanket() {
        assert!(wildcard_match("anything", "*"));
        assert!(wildcard_match("", "*"));
    }

    #[test]
    fn test_wildcard_suffix_and_prefix() {
        assert!(wildcard_match("schema.json", "*.json"));
        assert!(!wildcard_match("schema.jsonx", "*.json"));
        assert!(wildcard_match("schema.json", "schema.*"));
        assert!(wildcard_match("a-b-c", "a*c"));
        assert!(!wildcard_match("a-b-d", "a*c"));
    }
}
