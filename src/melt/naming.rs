//! Table and column names.
//!
//! A table name doubles as the stem of its output file, so it is sanitized
//! and kept unique across the catalog even when two identities would
//! naturally produce the same name.

use crate::melt::types::{MeltConfig, TableKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static UNSAFE_NAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{N}_\-]+").unwrap()
});

/// Replace every run of characters that are not letters, digits, `_` or `-`
/// with a single `_`.
pub fn sanitize(name: &str) -> String {
    let cleaned = UNSAFE_NAME_CHARS.replace_all(name, "_");
    if cleaned.is_empty() {
        String::from("_")
    } else {
        cleaned.into_owned()
    }
}

/// Longest table name kept as is. Leaves room for a counter suffix and the
/// `.csv` extension within the usual 255-byte file name limit.
pub const MAX_NAME_LEN: usize = 200;

/// Cut `name` to at most [`MAX_NAME_LEN`] bytes, on a character boundary.
pub fn truncate(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Return `base`, or `base<sep>2`, `base<sep>3`, ... whichever is not taken yet.
pub fn unique_name(base: &str, separator: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{separator}{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Derives file-safe, unique table names from table identities.
#[derive(Debug)]
pub struct TableNamer {
    root_name: String,
    separator: String,
    qualified: bool,
    taken: HashSet<String>,
}

impl TableNamer {
    pub fn new(config: &MeltConfig) -> Self {
        TableNamer {
            root_name: truncate(&sanitize(&config.root_name)).to_string(),
            separator: config.separator.clone(),
            qualified: config.qualified_names,
            taken: HashSet::new(),
        }
    }

    /// Name for a new table. `owner` is the name of the table holding the
    /// field, `None` for the root.
    ///
    /// Names longer than [`MAX_NAME_LEN`] are truncated; when that makes two
    /// tables collide the later one gets a counter suffix.
    pub fn assign(&mut self, owner: Option<(&str, &str)>, kind: TableKind) -> String {
        let name = match owner {
            None => unique_name(&self.root_name, &self.separator, &self.taken),
            Some((owner_name, field)) => {
                let field = sanitize(field);
                let qualified = format!("{owner_name}{}{field}", self.separator);
                let qualified = truncate(&qualified).to_string();
                let preferred = match kind {
                    TableKind::Child if !self.qualified => truncate(&field).to_string(),
                    _ => qualified.clone(),
                };
                if !self.taken.contains(&preferred) {
                    preferred
                } else {
                    unique_name(&qualified, &self.separator, &self.taken)
                }
            }
        };
        self.taken.insert(name.clone());
        name
    }

    /// Give up `name` so a later table may use it.
    pub fn release(&mut self, name: &str) {
        self.taken.remove(name);
    }
}
