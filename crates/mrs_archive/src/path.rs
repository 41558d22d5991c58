//! Validation and normalization of entry names.
//!
//! Entry names are kept with `/` separators and written to disk with `\`. A name must be safe to
//! use as a relative path on Windows, where the archives originate.

const INVALID_CHARACTERS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];
const RESERVED_NAMES: [&str; 4] = ["CON", "PRN", "AUX", "NUL"];

/// Whether `name` can be used as an entry name
///
/// A single trailing separator is allowed and marks a directory-only entry.
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with(['/', '\\']) {
        return false;
    }

    if name
        .chars()
        .any(|c| (c.is_ascii_control() && c != '\x7f') || INVALID_CHARACTERS.contains(&c))
    {
        return false;
    }

    let trimmed = name.strip_suffix(['/', '\\']).unwrap_or(name);
    trimmed.split(['/', '\\']).all(is_valid_component)
}

fn is_valid_component(component: &str) -> bool {
    !component.is_empty() && !component.ends_with('.') && !is_reserved(component)
}

fn is_reserved(component: &str) -> bool {
    let stem = component.split('.').next().unwrap_or(component);

    if RESERVED_NAMES
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
    {
        return true;
    }

    match stem.as_bytes() {
        [a, b, c, digit] => {
            let prefix = [*a, *b, *c];
            (prefix.eq_ignore_ascii_case(b"COM") || prefix.eq_ignore_ascii_case(b"LPT"))
                && digit.is_ascii_digit()
        }
        _ => false,
    }
}

/// Converts a stored name to the internal `/` separated form
pub fn to_internal(name: &str) -> String {
    name.replace('\\', "/")
}

/// Converts an internal name to the `\` separated form written to archives
pub fn to_stored(name: &str) -> String {
    name.replace('/', "\\")
}

/// Prefixes `name` with the `base` folder when one is given
pub fn with_base(base: Option<&str>, name: &str) -> String {
    match base.map(|b| b.trim_end_matches(['/', '\\'])) {
        Some(base) if !base.is_empty() => format!("{}/{}", to_internal(base), name),
        _ => name.to_owned(),
    }
}

/// Whether the name only describes a directory
pub fn is_directory_name(name: &str) -> bool {
    name.ends_with(['/', '\\'])
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{is_directory_name, is_valid_name, to_internal, to_stored, with_base};

    #[test]
    fn accepts_regular_names() {
        for name in [
            "a.txt",
            "model/woman/hair.elu",
            "sound\\bgm\\theme.ogg",
            "noextension",
            ".hidden",
            "interface/",
            "console.txt",
            "com10.dat",
        ] {
            assert!(is_valid_name(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        for name in [
            "",
            "/etc/shadow",
            "\\root",
            "C:/windows",
            "what?.txt",
            "a<b",
            "pipe|name",
            "star*",
            "quote\"",
            "tab\tname",
            "bell\x07",
            "trailing.",
            "dir./file",
            "..",
            "../escape.txt",
            "a/../b",
            "a//b",
            ".",
        ] {
            assert!(!is_valid_name(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn rejects_reserved_device_names() {
        for name in ["CON", "con.txt", "dir/Nul", "aux.tar.gz", "COM1", "lpt9.log", "prn"] {
            assert!(!is_valid_name(name), "{name} should be reserved");
        }
    }

    #[test]
    fn separators() {
        assert_eq!(to_internal("a\\b\\c.txt"), "a/b/c.txt");
        assert_eq!(to_stored("a/b/c.txt"), "a\\b\\c.txt");
        assert!(is_directory_name("a/b/"));
        assert!(!is_directory_name("a/b"));
    }

    #[test]
    fn base_prefix() {
        assert_eq!(with_base(None, "a.txt"), "a.txt");
        assert_eq!(with_base(Some(""), "a.txt"), "a.txt");
        assert_eq!(with_base(Some("model"), "a.txt"), "model/a.txt");
        assert_eq!(with_base(Some("model\\woman\\"), "a.txt"), "model/woman/a.txt");
    }
}
