//! Grouping engine: turn a flat file listing into multi-disc titles.
//!
//! Each file name runs through the marker resolver; files that share a title
//! become a group. Groups with fewer than two discs are dropped (a playlist
//! for a single disc is pointless), and groups that mix extensions are
//! rejected outright rather than partially grouped.

use rommate_parser::resolve;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// One disc file inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscFile {
    pub disc_index: u32,
    pub file_name: String,
}

/// A multi-disc title whose members all share one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscGroup {
    pub title: String,
    /// Lowercased extension shared by every member.
    pub extension: String,
    /// Sorted ascending by disc index; duplicate indices keep input order.
    pub discs: Vec<DiscFile>,
}

/// A candidate group refused because its members span several extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedFormatGroup {
    pub title: String,
    /// Distinct lowercased extensions seen, sorted.
    pub extensions: Vec<String>,
}

/// Result of a grouping pass.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// Accepted groups, keyed by title. BTreeMap keeps output order stable.
    pub groups: BTreeMap<String, DiscGroup>,
    pub mixed_format: Vec<MixedFormatGroup>,
}

impl Grouping {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.mixed_format.is_empty()
    }
}

/// Group `files` by the title their names resolve to.
///
/// Files without a recognized disc marker are ignored. The input paths are
/// reduced to bare file names, so re-grouping a directory that already holds
/// the emitted playlists yields the same groups.
pub fn group_files(files: &[PathBuf]) -> Grouping {
    struct Member {
        disc_index: u32,
        file_name: String,
        extension: String,
    }

    let mut candidates: BTreeMap<String, Vec<Member>> = BTreeMap::new();

    for path in files {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("Skipping file with non-UTF-8 name: {:?}", path);
            continue;
        };
        let Some(parsed) = resolve(file_name) else {
            continue;
        };
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        candidates.entry(parsed.title).or_default().push(Member {
            disc_index: parsed.disc_index,
            file_name: file_name.to_string(),
            extension,
        });
    }

    let mut grouping = Grouping::default();

    for (title, mut members) in candidates {
        if members.len() < 2 {
            continue;
        }

        let mut extensions: Vec<String> =
            members.iter().map(|m| m.extension.clone()).collect();
        extensions.sort();
        extensions.dedup();

        if extensions.len() > 1 {
            warn!(
                "Rejecting group '{}': mixed extensions {:?}",
                title, extensions
            );
            grouping
                .mixed_format
                .push(MixedFormatGroup { title, extensions });
            continue;
        }

        // Stable sort: equal indices keep the listing order.
        members.sort_by_key(|m| m.disc_index);
        let extension = extensions.pop().unwrap_or_default();
        let discs = members
            .into_iter()
            .map(|m| DiscFile {
                disc_index: m.disc_index,
                file_name: m.file_name,
            })
            .collect();

        grouping.groups.insert(
            title.clone(),
            DiscGroup {
                title,
                extension,
                discs,
            },
        );
    }

    grouping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn groups_matching_titles() {
        let grouping = group_files(&paths(&[
            "Final Quest (Disc 1).cue",
            "Final Quest (Disc 2).cue",
            "Lone Game.cue",
        ]));

        assert_eq!(grouping.groups.len(), 1);
        let group = &grouping.groups["Final Quest"];
        assert_eq!(group.extension, "cue");
        let names: Vec<_> = group.discs.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Final Quest (Disc 1).cue", "Final Quest (Disc 2).cue"]
        );
    }

    #[test]
    fn single_disc_titles_are_dropped() {
        let grouping = group_files(&paths(&["Solo (Disc 1).cue"]));
        assert!(grouping.is_empty());
    }

    #[test]
    fn discs_sort_by_index_not_listing_order() {
        let grouping = group_files(&paths(&[
            "Saga (Disc 3).chd",
            "Saga (Disc 1).chd",
            "Saga (Disc 2).chd",
        ]));

        let indices: Vec<_> = grouping.groups["Saga"]
            .discs
            .iter()
            .map(|d| d.disc_index)
            .collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_indices_keep_input_order() {
        let grouping = group_files(&paths(&[
            "Dup [Disc 1].iso",
            "Dup (Disc 1).iso",
            "Dup (Disc 2).iso",
        ]));

        let names: Vec<_> = grouping.groups["Dup"]
            .discs
            .iter()
            .map(|d| d.file_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Dup [Disc 1].iso", "Dup (Disc 1).iso", "Dup (Disc 2).iso"]
        );
    }

    #[test]
    fn mixed_extensions_reject_the_whole_group() {
        let grouping = group_files(&paths(&[
            "Hybrid (Disc 1).cue",
            "Hybrid (Disc 2).iso",
            "Clean (Disc 1).gdi",
            "Clean (Disc 2).gdi",
        ]));

        assert_eq!(grouping.groups.len(), 1);
        assert!(grouping.groups.contains_key("Clean"));
        assert_eq!(
            grouping.mixed_format,
            vec![MixedFormatGroup {
                title: "Hybrid".to_string(),
                extensions: vec!["cue".to_string(), "iso".to_string()],
            }]
        );
    }

    #[test]
    fn case_differences_in_extension_do_not_split_a_group() {
        let grouping = group_files(&paths(&[
            "Retro (Disc 1).CUE",
            "Retro (Disc 2).cue",
        ]));

        assert!(grouping.mixed_format.is_empty());
        assert_eq!(grouping.groups["Retro"].extension, "cue");
    }

    #[test]
    fn title_less_markers_never_form_a_group() {
        // A bare marker with nothing before it would group under "" and
        // produce a hidden ".m3u" playlist.
        let grouping = group_files(&paths(&["Disc 1.cue", "Disc 2.cue"]));
        assert!(grouping.is_empty());
    }

    #[test]
    fn unmarked_files_are_ignored() {
        let grouping = group_files(&paths(&["Plain Game.cue", "Other Game.iso"]));
        assert!(grouping.is_empty());
    }

    #[test]
    fn letter_and_numeric_markers_land_in_one_group() {
        // "Side A" resolves to index 1, same title space as numeric markers.
        let grouping = group_files(&paths(&[
            "Flip (Side A).gdi",
            "Flip (Side B).gdi",
        ]));

        let indices: Vec<_> = grouping.groups["Flip"]
            .discs
            .iter()
            .map(|d| d.disc_index)
            .collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn regrouping_emitted_names_is_idempotent() {
        let first = group_files(&paths(&[
            "Epic (Disc 1).cue",
            "Epic (Disc 2).cue",
        ]));
        let again: Vec<PathBuf> = first.groups["Epic"]
            .discs
            .iter()
            .map(|d| PathBuf::from(&d.file_name))
            .collect();
        let second = group_files(&again);
        assert_eq!(first.groups, second.groups);
    }
}
