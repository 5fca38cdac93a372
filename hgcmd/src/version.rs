use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Error;

lazy_static! {
    // Matches the parenthesized version clause of hg's human-readable
    // `hg version` banner, e.g. "Mercurial Distributed SCM (version 6.7.4)"
    // or "... (version 6.7+20-hg1234)". Captures major, minor, an optional
    // trivial component, and whatever trails it up to the closing paren.
    static ref VERSION_RE: Regex =
        Regex::new(r"\([^0-9()]*(\d+)\.(\d+)(?:\.(\d+))?([^)]*)\)").expect("static regex is valid");
}

/// Parse the banner `hg version` prints and normalize it to
/// `major.minor.trivial[extra]`, with `trivial` defaulting to `0`.
///
/// A banner whose parenthesized clause does not match the expected shape
/// is a hard error rather than a guess: this mirrors the design note in
/// spec.md 9 that the source raises rather than falling back to the raw
/// banner on a pre-release or otherwise unexpected format.
pub fn parse_banner(banner: &str) -> Result<String, Error> {
    let caps = VERSION_RE
        .captures(banner)
        .ok_or_else(|| Error::ProtocolViolation(format!("could not parse hg version banner: {banner:?}")))?;

    let major = &caps[1];
    let minor = &caps[2];
    let trivial = caps.get(3).map(|m| m.as_str()).unwrap_or("0");
    let extra = caps.get(4).map(|m| m.as_str().trim()).unwrap_or("");

    Ok(format!("{major}.{minor}.{trivial}{extra}"))
}
