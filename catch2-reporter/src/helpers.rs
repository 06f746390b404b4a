// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Lexically normalizes a path reported by Catch2.
///
/// `.` components are removed and `..` components are resolved against preceding normal
/// components. The file system is never consulted.
pub(crate) fn normalize_path(path: &str) -> Utf8PathBuf {
    let mut components: Vec<Utf8Component<'_>> = Vec::new();
    for component in Utf8Path::new(path).components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match components.last() {
                Some(Utf8Component::Normal(_)) => {
                    components.pop();
                }
                // `/..` is `/`.
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }

    if components.is_empty() {
        return Utf8PathBuf::from(".");
    }
    components.iter().collect()
}

/// Normalizes an optional `filename` attribute, treating an empty value as absent.
pub(crate) fn normalize_filename(filename: Option<&str>) -> Option<Utf8PathBuf> {
    filename
        .filter(|filename| !filename.is_empty())
        .map(normalize_path)
}

/// Returns the first line of a message, for use as a decoration label.
pub(crate) fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
