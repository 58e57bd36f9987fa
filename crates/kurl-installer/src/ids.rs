//! Installer identifiers
//!
//! Generated ids are 7 lowercase hex characters; team installers use slugs.
//! A slug that looks like a generated id is rejected before it is stored, so
//! [`is_sha`] alone decides which id space an id belongs to.

use regex::Regex;
use std::sync::LazyLock;

static SHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{7}$").expect("sha regex is valid"));

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_-]{1,255}$").expect("slug regex is valid"));

/// Slugs that collide with fixed routes
pub const RESERVED_SLUGS: [&str; 9] = [
    "latest",
    "beta",
    "stable",
    "unstable",
    "healthz",
    "dist",
    "installer",
    "bundle",
    "versions",
];

/// Whether `id` is a generated (content hash) id
pub fn is_sha(id: &str) -> bool {
    SHA_RE.is_match(id)
}

pub fn is_valid_slug(id: &str) -> bool {
    SLUG_RE.is_match(id)
}

/// Case-insensitive check against [`RESERVED_SLUGS`]
pub fn slug_is_reserved(id: &str) -> bool {
    let lowered = id.to_ascii_lowercase();
    RESERVED_SLUGS.contains(&lowered.as_str())
}

/// CIDR size as `N` or `/N`, 0 < N <= 32. Trailing garbage after the
/// leading digits is ignored.
pub fn is_valid_cidr_range(range: &str) -> bool {
    let trimmed = range.strip_prefix('/').unwrap_or(range).trim_start();
    let (sign, digits) = match trimmed.strip_prefix(['+', '-']) {
        Some(rest) => (&trimmed[..1], rest),
        None => ("", trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return false;
    }
    match digits[..end].parse::<u64>() {
        Ok(n) => sign != "-" && n > 0 && n <= 32,
        Err(_) => false,
    }
}

/// Package artifact name for a component version, e.g. `cert-manager-1.9.1`
/// or `k-3-s-v1.23.3-k3s1`
pub fn package_name(component: &str, version: &str) -> String {
    format!("{}-{}", kebab_case(component), version.replace('+', "-"))
}

/// Split on case changes, letter/digit boundaries and separators
fn kebab_case(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        let boundary = match prev {
            Some(p) => {
                (p.is_ascii_lowercase() && c.is_ascii_uppercase())
                    || (p.is_ascii_digit() != c.is_ascii_digit())
            }
            None => false,
        };
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c.to_ascii_lowercase());
        prev = Some(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join("-")
}
