//! Detection of colliding entry names and generation of alternate names.
//!
//! Names compare ASCII case-insensitively. A name is split into a base and an extension at the last
//! `.` of its final path segment, and a base ending in ` (k)` carries the copy number `k`. Adding
//! `icon.tga` next to `icon.tga` and `icon (2).tga` yields `icon (3).tga`.

use tracing::debug;

use crate::error::{Error, Result};

/// What to do when an added entry has the same name as an existing one
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum OnDupe {
    /// Replace the existing entry with the new one
    #[default]
    KeepNew,
    /// Keep the existing entry and reject the new one
    KeepOld,
    /// Keep both, renaming the new one
    KeepBoth,
}

/// Result of scanning existing names for a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// Index of the first name equal to the candidate
    pub exact: Option<usize>,
    /// A name derived from the candidate that collides with nothing scanned
    pub alternate: String,
}

/// Where a candidate entry ends up once the on-dupe policy is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Added as a new entry under this name
    New(String),
    /// Overwrites the existing entry at this index
    Replace(usize),
}

#[derive(Debug)]
struct SplitName<'a> {
    bare: &'a str,
    number: Option<u64>,
    extension: &'a str,
}

fn split_name(name: &str) -> SplitName<'_> {
    let segment_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let (base, extension) = match name[segment_start..].rfind('.') {
        Some(dot) => name.split_at(segment_start + dot),
        None => (name, ""),
    };

    let (bare, number) = match split_number(base) {
        Some((bare, number)) => (bare, Some(number)),
        None => (base, None),
    };

    SplitName {
        bare,
        number,
        extension,
    }
}

/// Splits `"name (12)"` into `("name", 12)`
fn split_number(base: &str) -> Option<(&str, u64)> {
    let inner = base.strip_suffix(')')?;
    let open = inner.rfind(" (")?;
    let digits = &inner[open + 2..];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((&inner[..open], digits.parse().ok()?))
}

/// Scans `existing` names for collisions with `candidate`
///
/// Returns `None` when no name is equal to the candidate and none shares its base and extension.
pub fn resolve<'a>(existing: impl IntoIterator<Item = &'a str>, candidate: &str) -> Option<Duplicate> {
    let wanted = split_name(candidate);

    let mut exact = None;
    let mut same_base = false;
    let mut numbers = Vec::new();

    for (index, name) in existing.into_iter().enumerate() {
        if exact.is_none() && name.eq_ignore_ascii_case(candidate) {
            exact = Some(index);
        }

        let other = split_name(name);
        if other.extension.eq_ignore_ascii_case(wanted.extension)
            && other.bare.eq_ignore_ascii_case(wanted.bare)
        {
            same_base = true;
            numbers.extend(other.number);
        }
    }

    if exact.is_none() && !same_base {
        return None;
    }

    numbers.sort_unstable();

    let mut assigned = if exact.is_some() { 2 } else { 0 };
    for number in numbers {
        if assigned < number {
            break;
        }
        if assigned == number {
            assigned += 1;
        }
    }

    Some(Duplicate {
        exact,
        alternate: format!("{} ({}){}", wanted.bare, assigned, wanted.extension),
    })
}

/// Applies `on_dupe` to the collision status of `candidate`
///
/// Only an exact match counts as a collision; a name that merely shares a base is added as is.
pub fn place<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    candidate: &str,
    on_dupe: OnDupe,
) -> Result<Placement> {
    let Some(Duplicate {
        exact: Some(index),
        alternate,
    }) = resolve(existing, candidate)
    else {
        return Ok(Placement::New(candidate.to_owned()));
    };

    debug!(candidate, index, ?on_dupe, "duplicate name");
    match on_dupe {
        OnDupe::KeepNew => Ok(Placement::Replace(index)),
        OnDupe::KeepOld => Err(Error::Duplicate(candidate.to_owned())),
        OnDupe::KeepBoth => Ok(Placement::New(alternate)),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{place, resolve, split_name, Duplicate, OnDupe, Placement};
    use crate::error::{Error, Result};

    #[test]
    fn split_names() {
        let split = split_name("icon (12).tga");
        assert_eq!((split.bare, split.number, split.extension), ("icon", Some(12), ".tga"));

        let split = split_name("dir.v2/readme");
        assert_eq!((split.bare, split.number, split.extension), ("dir.v2/readme", None, ""));

        let split = split_name("archive.tar.gz");
        assert_eq!((split.bare, split.number, split.extension), ("archive.tar", None, ".gz"));

        let split = split_name("icon(2).tga");
        assert_eq!((split.bare, split.number), ("icon(2)", None));

        let split = split_name("icon ().tga");
        assert_eq!((split.bare, split.number), ("icon ()", None));

        let split = split_name("icon (x2).tga");
        assert_eq!((split.bare, split.number), ("icon (x2)", None));
    }

    #[test]
    fn not_a_duplicate() {
        assert_eq!(resolve(["b.txt", "a.dat"], "a.txt"), None);
        assert_eq!(resolve([], "a.txt"), None);
    }

    #[test]
    fn exact_match_gets_next_number() {
        assert_eq!(
            resolve(["icon.tga", "icon (2).tga"], "icon.tga"),
            Some(Duplicate {
                exact: Some(0),
                alternate: "icon (3).tga".into()
            })
        );
    }

    #[test]
    fn gaps_are_filled() {
        let existing = ["a.txt", "a (2).txt", "a (4).txt"];
        assert_eq!(
            resolve(existing, "A.TXT").map(|d| d.alternate),
            Some("a (3).txt".into())
        );
    }

    #[test]
    fn repeated_numbers() {
        let existing = ["a (2).txt", "a.txt", "A (2).TXT", "a (3).txt"];
        assert_eq!(
            resolve(existing, "a.txt"),
            Some(Duplicate {
                exact: Some(1),
                alternate: "a (4).txt".into()
            })
        );
    }

    #[test]
    fn candidate_with_number() {
        assert_eq!(
            resolve(["a (2).txt"], "a (2).txt"),
            Some(Duplicate {
                exact: Some(0),
                alternate: "a (3).txt".into()
            })
        );
    }

    #[test]
    fn same_base_without_exact_match() {
        assert_eq!(
            resolve(["a (2).txt"], "a.txt"),
            Some(Duplicate {
                exact: None,
                alternate: "a (0).txt".into()
            })
        );
    }

    #[test]
    fn different_extension_is_not_same_base() {
        assert_eq!(resolve(["a (2).dat", "a"], "a.txt"), None);
    }

    #[test]
    fn keep_both_chains() -> Result<()> {
        let mut names = vec!["a.txt".to_owned()];

        for expected in ["a (2).txt", "a (3).txt"] {
            let Placement::New(name) = place(names.iter().map(String::as_str), "a.txt", OnDupe::KeepBoth)?
            else {
                panic!("expected a new entry");
            };
            assert_eq!(name, expected);
            names.push(name);
        }

        Ok(())
    }

    #[test]
    fn keep_new_replaces_first_exact() -> Result<()> {
        let names = ["a.txt", "a (2).txt", "A.txt"];
        assert_eq!(place(names, "a.txt", OnDupe::KeepNew)?, Placement::Replace(0));
        Ok(())
    }

    #[test]
    fn keep_old_rejects() {
        assert!(matches!(
            place(["a.txt"], "a.txt", OnDupe::KeepOld),
            Err(Error::Duplicate(name)) if name == "a.txt"
        ));
    }

    #[test]
    fn same_base_alone_is_not_a_collision() -> Result<()> {
        assert_eq!(
            place(["a (2).txt"], "a.txt", OnDupe::KeepOld)?,
            Placement::New("a.txt".into())
        );
        Ok(())
    }
}
