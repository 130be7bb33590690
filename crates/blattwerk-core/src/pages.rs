// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-range parsing — turns free text such as "1-3, 7; 10" into normalized
// page sets.
//
// Syntax: comma-separated tokens, each either `N` or `A-B` (inclusive, either
// order). Groups are separated by `;` or newlines. Malformed tokens are
// skipped, never fatal; the caller decides whether an empty result is an
// error.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Highest page number the parser will produce. Keeps "1-999999999" from
/// allocating a billion entries.
pub const MAX_PAGE_NUMBER: u32 = 100_000;

/// A normalized selection: a flat ascending page list plus optional groups.
///
/// Invariant: `pages` is the deduplicated union of `groups` whenever groups
/// are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelection {
    /// Strictly ascending, 1-based, duplicate-free.
    pub pages: Vec<u32>,
    /// Independent output ranges, in the order they were written.
    pub groups: Vec<Vec<u32>>,
}

impl PageSelection {
    /// Build a selection from the request's flat list and groups.
    ///
    /// Non-empty groups take precedence: the flat list is then rebuilt as
    /// their union and the request's own `pages` are ignored.
    pub fn from_request(pages: &[i64], groups: &[Vec<i64>]) -> Self {
        let groups: Vec<Vec<u32>> = groups
            .iter()
            .map(|group| normalize(group.iter().copied()))
            .filter(|group| !group.is_empty())
            .collect();
        let pages = if groups.is_empty() {
            normalize(pages.iter().copied())
        } else {
            union(&groups)
        };
        Self { pages, groups }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Drop every page beyond `page_count`, and any group left empty.
    pub fn clamp_to(&self, page_count: u32) -> Self {
        let in_range = |page: &u32| *page <= page_count;
        Self {
            pages: self.pages.iter().copied().filter(in_range).collect(),
            groups: self
                .groups
                .iter()
                .map(|group| group.iter().copied().filter(in_range).collect::<Vec<_>>())
                .filter(|group| !group.is_empty())
                .collect(),
        }
    }

    /// Groups to produce one output each; the flat list when no groups exist.
    pub fn output_groups(&self) -> Vec<Vec<u32>> {
        if self.groups.is_empty() {
            if self.pages.is_empty() {
                Vec::new()
            } else {
                vec![self.pages.clone()]
            }
        } else {
            self.groups.clone()
        }
    }
}

/// Parse a flat page list: `parse_pages("3,1,2-2") == [1, 2, 3]`.
pub fn parse_pages(text: &str) -> Vec<u32> {
    normalize(text.split(',').flat_map(expand_token))
}

/// Parse grouped input, one group per `;` or line.
pub fn parse_groups(text: &str) -> PageSelection {
    let groups = text
        .split([';', '\n'])
        .map(parse_pages)
        .filter(|group| !group.is_empty())
        .collect::<Vec<_>>();
    let pages = union(&groups);
    PageSelection { pages, groups }
}

/// Sort, deduplicate, and drop anything outside `1..=MAX_PAGE_NUMBER`.
pub fn normalize(pages: impl IntoIterator<Item = i64>) -> Vec<u32> {
    pages
        .into_iter()
        .filter(|page| (1..=i64::from(MAX_PAGE_NUMBER)).contains(page))
        .map(|page| page as u32)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Compact label for an ascending page list: `[1, 2, 3, 10]` → `p1-3_p10`.
pub fn range_label(pages: &[u32]) -> String {
    let mut runs: Vec<String> = Vec::new();
    let mut iter = pages.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            runs.push(format!("p{start}"));
        } else {
            runs.push(format!("p{start}-{end}"));
        }
    }
    runs.join("_")
}

// -- Helpers ------------------------------------------------------------------

/// Expand one comma-separated token into candidate page numbers.
fn expand_token(token: &str) -> Vec<i64> {
    let token = token.trim();
    if token.is_empty() {
        return Vec::new();
    }

    match token.split_once('-') {
        Some((left, right)) => {
            let (Ok(a), Ok(b)) = (left.trim().parse::<i64>(), right.trim().parse::<i64>()) else {
                return Vec::new();
            };
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let low = low.max(1);
            let high = high.min(i64::from(MAX_PAGE_NUMBER));
            if low > high {
                return Vec::new();
            }
            (low..=high).collect()
        }
        None => token.parse::<i64>().map(|page| vec![page]).unwrap_or_default(),
    }
}

fn union(groups: &[Vec<u32>]) -> Vec<u32> {
    groups
        .iter()
        .flatten()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_list_is_sorted_and_deduplicated() {
        assert_eq!(parse_pages("3,1,2"), vec![1, 2, 3]);
        assert_eq!(parse_pages("2,2,1-3"), vec![1, 2, 3]);
    }

    #[test]
    fn reversed_range_is_expanded() {
        assert_eq!(parse_pages("5-3"), vec![3, 4, 5]);
    }

    #[test]
    fn malformed_tokens_are_ignored() {
        assert_eq!(parse_pages("abc,,2"), vec![2]);
        assert_eq!(parse_pages("0,-4,3-,x-2, 7 "), vec![7]);
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(parse_pages("").is_empty());
        assert!(parse_pages(" , ,abc").is_empty());
        assert!(parse_groups("").is_empty());
    }

    #[test]
    fn range_crossing_zero_keeps_positive_pages() {
        assert_eq!(parse_pages("3-0"), vec![1, 2, 3]);
    }

    #[test]
    fn oversized_range_is_capped() {
        let pages = parse_pages("99999-999999999");
        assert_eq!(pages, vec![99_999, 100_000]);
    }

    #[test]
    fn groups_split_on_semicolons_and_newlines() {
        let selection = parse_groups("1-2;5");
        assert_eq!(selection.groups, vec![vec![1, 2], vec![5]]);
        assert_eq!(selection.pages, vec![1, 2, 5]);

        let selection = parse_groups("4\n1-2;;junk\n2");
        assert_eq!(selection.groups, vec![vec![4], vec![1, 2], vec![2]]);
        assert_eq!(selection.pages, vec![1, 2, 4]);
    }

    #[test]
    fn flat_list_is_union_of_groups() {
        let selection = parse_groups("9,3;3-5\n1");
        let mut union: Vec<u32> = selection.groups.iter().flatten().copied().collect();
        union.sort_unstable();
        union.dedup();
        assert_eq!(selection.pages, union);
    }

    #[test]
    fn clamp_drops_out_of_range_pages_and_empty_groups() {
        let selection = parse_groups("1-2;7-9;3");
        let clamped = selection.clamp_to(5);
        assert_eq!(clamped.pages, vec![1, 2, 3]);
        assert_eq!(clamped.groups, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn request_groups_define_the_flat_list() {
        let selection = PageSelection::from_request(&[4, 0, -1], &[vec![2, 1], vec![]]);
        assert_eq!(selection.pages, vec![1, 2]);
        assert_eq!(selection.groups, vec![vec![1, 2]]);

        // Pages outside every group would never reach an output.
        let selection = PageSelection::from_request(&[2, 9], &[vec![1]]);
        assert_eq!(selection.pages, vec![1]);
        assert_eq!(selection.output_groups(), vec![vec![1]]);
    }

    #[test]
    fn request_without_groups_keeps_flat_list() {
        let selection = PageSelection::from_request(&[9, 2, 2, 0], &[vec![0, -3]]);
        assert_eq!(selection.pages, vec![2, 9]);
        assert!(selection.groups.is_empty());
    }

    #[test]
    fn output_groups_fall_back_to_flat_list() {
        let selection = PageSelection::from_request(&[2, 4], &[]);
        assert_eq!(selection.output_groups(), vec![vec![2, 4]]);
        assert!(PageSelection::default().output_groups().is_empty());
    }

    #[test]
    fn labels_compress_consecutive_runs() {
        assert_eq!(range_label(&[1, 2, 3, 10]), "p1-3_p10");
        assert_eq!(range_label(&[1]), "p1");
        assert_eq!(range_label(&[3, 4]), "p3-4");
        assert_eq!(range_label(&[2, 4, 5, 6, 9]), "p2_p4-6_p9");
        assert_eq!(range_label(&[]), "");
    }
}
