//! # rommate-parser
//!
//! Parses disc-image filenames into `(title, disc index)` pairs.
//!
//! Multi-disc releases name their files with a *disc marker* — `(Disc 2)`,
//! `[CD 1]`, `(Side B)` and friends. This crate recognizes the marker
//! families in a fixed priority order and extracts the title preceding the
//! marker. Filenames without a recognized marker are simply not multi-disc;
//! that is a normal outcome, not an error.
//!
//! ```
//! use rommate_parser::resolve;
//!
//! let parsed = resolve("Mega Game (Disc 2).cue").unwrap();
//! assert_eq!(parsed.title, "Mega Game");
//! assert_eq!(parsed.disc_index, 2);
//!
//! assert!(resolve("Mega Game.cue").is_none());
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A filename resolved to its multi-disc components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    /// Title text preceding the disc marker, trailing separators stripped.
    pub title: String,
    /// 1-based disc position. Letters map to alphabet position (A=1, B=2).
    pub disc_index: u32,
}

/// How a pattern's captured marker token decodes to a disc index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexKind {
    /// The capture is a decimal number, used as-is.
    Numeric,
    /// The capture is a single letter; index is its alphabet position.
    Letter,
}

/// One marker family: an anchored pattern plus its index decoder.
struct MarkerPattern {
    regex: Regex,
    kind: IndexKind,
}

/// The marker families in priority order. Delimited forms come before the
/// bare form so that `Foo (Disc 2)` is never claimed by the bare family
/// with a mangled title. First match wins; order changes are a behavior
/// change and are pinned by tests.
static MARKER_PATTERNS: LazyLock<Vec<MarkerPattern>> = LazyLock::new(|| {
    let numeric = [
        r"(?i)^(.*?)[\s\-_]*\(Dis[ck]\s*(\d+)\)",
        r"(?i)^(.*?)[\s\-_]*\[Dis[ck]\s*(\d+)\]",
        r"(?i)^(.*?)[\s\-_]*Dis[ck]\s*(\d+)",
        r"(?i)^(.*?)[\s\-_]*\(CD\s*(\d+)\)",
        r"(?i)^(.*?)[\s\-_]*\[CD\s*(\d+)\]",
        r"(?i)^(.*?)[\s\-_]*CD\s*(\d+)",
    ];
    let letter = [
        r"(?i)^(.*?)[\s\-_]*\((?:Side|Dis[ck])\s*([A-Za-z])\)",
        r"(?i)^(.*?)[\s\-_]*\[(?:Side|Dis[ck])\s*([A-Za-z])\]",
    ];

    numeric
        .iter()
        .map(|p| (p, IndexKind::Numeric))
        .chain(letter.iter().map(|p| (p, IndexKind::Letter)))
        .map(|(pattern, kind)| MarkerPattern {
            regex: Regex::new(pattern).expect("marker pattern must compile"),
            kind,
        })
        .collect()
});

/// Resolve a filename into its title and disc index.
///
/// The extension is stripped before matching, so both `"Foo (Disc 1).cue"`
/// and `"Foo (Disc 1)"` resolve identically. Returns `None` when no marker
/// family matches, when a numeric marker carries index `0` (disc indices are
/// 1-based; a zero marker is a naming mistake, not disc zero), or when
/// nothing but separators precedes the marker — a bare `"Disc 1.cue"` has no
/// title to group under.
pub fn resolve(filename: &str) -> Option<ParsedTitle> {
    let stem = strip_extension(filename);

    for pattern in MARKER_PATTERNS.iter() {
        let Some(captures) = pattern.regex.captures(stem) else {
            continue;
        };

        let title = captures
            .get(1)
            .map(|m| m.as_str())?
            .trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .to_string();
        if title.is_empty() {
            return None;
        }
        let token = captures.get(2)?.as_str();

        let disc_index = match pattern.kind {
            IndexKind::Numeric => token.parse::<u32>().ok()?,
            IndexKind::Letter => {
                let letter = token.chars().next()?.to_ascii_uppercase();
                (letter as u32) - ('A' as u32) + 1
            }
        };

        if disc_index == 0 {
            return None;
        }

        return Some(ParsedTitle { title, disc_index });
    }

    None
}

/// Strip the final extension from a filename without touching directories.
fn strip_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_resolves(name: &str, title: &str, index: u32) {
        let parsed = resolve(name).unwrap_or_else(|| panic!("no marker found in {name:?}"));
        assert_eq!(parsed.title, title, "title for {name:?}");
        assert_eq!(parsed.disc_index, index, "index for {name:?}");
    }

    #[test]
    fn parenthesized_disc() {
        assert_resolves("Mega Game (Disc 2).cue", "Mega Game", 2);
        assert_resolves("Mega Game (Disk 10).iso", "Mega Game", 10);
    }

    #[test]
    fn bracketed_disc() {
        assert_resolves("Mega Game [Disc 1].chd", "Mega Game", 1);
        assert_resolves("Mega Game [Disk 3].gdi", "Mega Game", 3);
    }

    #[test]
    fn bare_disc() {
        assert_resolves("Mega Game Disc 2.cue", "Mega Game", 2);
        assert_resolves("Mega Game Disk2.cue", "Mega Game", 2);
    }

    #[test]
    fn parenthesized_cd() {
        assert_resolves("Mega Game (CD 1).cdi", "Mega Game", 1);
        assert_resolves("Mega Game (CD2).cue", "Mega Game", 2);
    }

    #[test]
    fn bracketed_cd() {
        assert_resolves("Mega Game [CD 4].cue", "Mega Game", 4);
    }

    #[test]
    fn bare_cd() {
        assert_resolves("Mega Game CD1.cue", "Mega Game", 1);
    }

    #[test]
    fn parenthesized_side_letter() {
        assert_resolves("Mega Game (Side A).cue", "Mega Game", 1);
        assert_resolves("Mega Game (Side B).cue", "Mega Game", 2);
        assert_resolves("Mega Game (Disk C).cue", "Mega Game", 3);
    }

    #[test]
    fn bracketed_side_letter() {
        assert_resolves("Mega Game [Side B].cdi", "Mega Game", 2);
        assert_resolves("Mega Game [Side z].cdi", "Mega Game", 26);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_resolves("Mega Game (DISC 2).cue", "Mega Game", 2);
        assert_resolves("Mega Game [cd 1].cue", "Mega Game", 1);
    }

    #[test]
    fn trailing_separators_are_trimmed() {
        assert_resolves("Mega Game - (Disc 1).cue", "Mega Game", 1);
        assert_resolves("Mega Game_(Disc 1).cue", "Mega Game", 1);
        assert_resolves("Mega Game -_ (Disc 1).cue", "Mega Game", 1);
    }

    #[test]
    fn delimited_beats_bare() {
        // The bare family would capture "(Disc" into the title; the
        // parenthesized family must win instead.
        assert_resolves("Foo (Disc 2).cue", "Foo", 2);
        // And numeric disc families outrank the letter families for the
        // shared "(Disk …)" spelling.
        assert_resolves("Foo (Disk 2).cue", "Foo", 2);
    }

    #[test]
    fn unmarked_names_resolve_to_none() {
        assert!(resolve("Mega Game.cue").is_none());
        assert!(resolve("Mega Game (USA).iso").is_none());
        assert!(resolve("").is_none());
    }

    #[test]
    fn disc_zero_is_rejected() {
        assert!(resolve("Mega Game (Disc 0).cue").is_none());
    }

    #[test]
    fn marker_without_a_title_is_rejected() {
        assert!(resolve("Disc 1.cue").is_none());
        assert!(resolve("(Disc 1).cue").is_none());
        assert!(resolve("- Disc 2.cue").is_none());
        assert!(resolve("CD 1.iso").is_none());
    }

    #[test]
    fn extension_is_stripped_before_matching() {
        // Without stripping, the trailing ".cue" would not block a match,
        // but a dotted title must still survive intact.
        assert_resolves("Game v1.5 (Disc 2).cue", "Game v1.5", 2);
    }
}
