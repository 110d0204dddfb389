//! Child environment preparation: placeholder expansion and PATH augmentation.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// `$NAME`, `${NAME}` on every platform, plus `%NAME%` on Windows
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        let pattern = if cfg!(windows) {
            r"\$([A-Za-z_][A-Za-z0-9_]*)|\$\{([^}]*)\}|%([^%]+)%"
        } else {
            r"\$([A-Za-z_][A-Za-z0-9_]*)|\$\{([^}]*)\}"
        };
        Regex::new(pattern).expect("placeholder pattern is valid")
    })
}

/// Expand environment placeholders in a shell path.
///
/// Unknown variables are left untouched, so a literal `$` or `%` in a path
/// survives expansion.
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expansion against an arbitrary variable lookup
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    placeholder_regex()
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// PATH value for the child: inherited entries followed by `extra`.
///
/// `extra` may already start with the platform separator (the macOS default
/// does); a separator is only inserted when missing. Returns `None` when there
/// is nothing to add.
pub fn augmented_path(inherited: Option<&str>, extra: &str) -> Option<String> {
    let extra = extra.trim();
    if extra.is_empty() {
        return None;
    }

    let separator = if cfg!(windows) { ';' } else { ':' };
    let inherited = inherited.unwrap_or_default();

    let joined = if inherited.is_empty() {
        extra.trim_start_matches(separator).to_string()
    } else if inherited.ends_with(separator) || extra.starts_with(separator) {
        format!("{inherited}{extra}")
    } else {
        format!("{inherited}{separator}{extra}")
    };
    Some(joined)
}
