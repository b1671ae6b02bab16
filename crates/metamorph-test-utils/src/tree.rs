//! Directory tree comparison
//!
//! [`assert_transformation`] compares a baseline application with a
//! transformed one and panics with a report listing what is missing,
//! unexpected, or different. A missing or unexpected folder is reported once;
//! its contents are not listed.
//!
//! Files are compared byte for byte unless [`Comparison::XmlSemantic`] is
//! requested, in which case `.xml` files that parse on both sides are equal
//! when their element trees are. Attribute order, whitespace-only text,
//! comments and surrounding whitespace of text nodes are then ignored.

use roxmltree::{Document, Node};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const HEADER: &str = "Baseline and transformed applications don't match, as detailed below:\n\n";

/// Differences between two trees
///
/// Paths are rendered from the tree root with a leading `/`; folders carry a
/// trailing ` <dir>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
    pub different: Vec<String>,
}

impl TreeDiff {
    /// Check if both trees match
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.different.is_empty()
    }

    /// Render the mismatch report
    #[must_use]
    pub fn report(&self) -> String {
        let sections = [
            ("Missing in transformed application:", &self.missing),
            ("Unexpectedly found in transformed application:", &self.unexpected),
            ("Different file content:", &self.different),
        ];

        let body = sections
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(title, entries)| {
                let mut section = format!("{title}\n");
                for entry in entries.iter() {
                    let _ = writeln!(section, "\t{entry}");
                }
                section
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!("{HEADER}{body}")
    }
}

/// How file contents are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Comparison {
    /// Byte for byte
    #[default]
    Binary,
    /// `.xml` files by element tree, everything else byte for byte
    XmlSemantic,
}

/// Compare `baseline` with `transformed` byte for byte
///
/// # Panics
/// If either folder cannot be read.
#[must_use]
pub fn compare_trees(baseline: &Path, transformed: &Path) -> TreeDiff {
    compare_trees_with(baseline, transformed, Comparison::Binary)
}

/// Compare `baseline` with `transformed` using `comparison` for file contents
///
/// # Panics
/// If either folder cannot be read.
#[must_use]
pub fn compare_trees_with(baseline: &Path, transformed: &Path, comparison: Comparison) -> TreeDiff {
    let mut diff = TreeDiff::default();
    compare_dir(baseline, transformed, "", comparison, &mut diff);
    diff.missing.sort();
    diff.unexpected.sort();
    diff.different.sort();
    diff
}

/// Assert that `transformed` matches `baseline` file by file
///
/// # Panics
/// With the mismatch report when the trees differ.
pub fn assert_transformation(baseline: &Path, transformed: &Path) {
    assert_transformation_with(baseline, transformed, Comparison::Binary);
}

/// Assert that `transformed` matches `baseline` using `comparison`
///
/// # Panics
/// With the mismatch report when the trees differ.
pub fn assert_transformation_with(baseline: &Path, transformed: &Path, comparison: Comparison) {
    let diff = compare_trees_with(baseline, transformed, comparison);
    assert!(diff.is_empty(), "{}", diff.report());
}

/// Relative paths of every entry below `root`, sorted, folders ending in `/`
///
/// # Panics
/// If the tree cannot be walked.
#[must_use]
pub fn list_tree(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if entry.file_type().is_dir() {
                format!("{relative}/")
            } else {
                relative
            }
        })
        .collect()
}

fn names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", dir.display()))
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn compare_dir(
    baseline: &Path,
    transformed: &Path,
    prefix: &str,
    comparison: Comparison,
    diff: &mut TreeDiff,
) {
    let expected = names(baseline);
    let actual = names(transformed);

    for name in expected.union(&actual) {
        let relative = format!("{prefix}/{name}");
        let b = baseline.join(name);
        let t = transformed.join(name);
        let b_dir = b.is_dir();
        let t_dir = t.is_dir();

        match (expected.contains(name), actual.contains(name)) {
            (true, false) => diff.missing.push(label(&relative, b_dir)),
            (false, true) => diff.unexpected.push(label(&relative, t_dir)),
            _ if b_dir && t_dir => compare_dir(&b, &t, &relative, comparison, diff),
            _ if b_dir != t_dir => {
                diff.missing.push(label(&relative, b_dir));
                diff.unexpected.push(label(&relative, t_dir));
            }
            _ => {
                if !same_content(&b, &t, comparison) {
                    diff.different.push(relative);
                }
            }
        }
    }
}

fn same_content(baseline: &Path, transformed: &Path, comparison: Comparison) -> bool {
    let (Ok(expected), Ok(actual)) = (fs::read(baseline), fs::read(transformed)) else {
        return false;
    };
    if expected == actual {
        return true;
    }
    let is_xml = baseline
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    comparison == Comparison::XmlSemantic && is_xml && same_xml(&expected, &actual).unwrap_or(false)
}

/// `None` when either side is not well-formed XML
fn same_xml(expected: &[u8], actual: &[u8]) -> Option<bool> {
    let expected = Document::parse(std::str::from_utf8(expected).ok()?).ok()?;
    let actual = Document::parse(std::str::from_utf8(actual).ok()?).ok()?;
    Some(same_element(expected.root_element(), actual.root_element()))
}

fn same_element(expected: Node<'_, '_>, actual: Node<'_, '_>) -> bool {
    let expected_children = significant_children(expected);
    let actual_children = significant_children(actual);

    expected.tag_name().namespace() == actual.tag_name().namespace()
        && expected.tag_name().name() == actual.tag_name().name()
        && attributes(expected) == attributes(actual)
        && expected_children.len() == actual_children.len()
        && expected_children
            .into_iter()
            .zip(actual_children)
            .all(|(e, a)| match (e.is_element(), a.is_element()) {
                (true, true) => same_element(e, a),
                (false, false) => e.text().map(str::trim) == a.text().map(str::trim),
                _ => false,
            })
}

fn significant_children<'a, 'input>(node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    node.children()
        .filter(|child| {
            child.is_element()
                || (child.is_text() && child.text().is_some_and(|t| !t.trim().is_empty()))
        })
        .collect()
}

fn attributes(node: Node<'_, '_>) -> BTreeSet<(Option<String>, String, String)> {
    node.attributes()
        .map(|a| {
            (
                a.namespace().map(str::to_string),
                a.name().to_string(),
                a.value().to_string(),
            )
        })
        .collect()
}

fn label(relative: &str, is_dir: bool) -> String {
    if is_dir {
        format!("{relative} <dir>")
    } else {
        relative.to_string()
    }
}
