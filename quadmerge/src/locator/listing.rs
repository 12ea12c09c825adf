//! Directory listings, decoupled from the filesystem.
//!
//! The traversal turns each `read_dir` into a [`Listing`] and asks pure
//! questions of it, so leaf detection can be tested on hand-built fixtures.

use std::fs;
use std::io;
use std::path::Path;

/// What a directory entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl ListingEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Contents of one directory, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn new(mut entries: Vec<ListingEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// Read `dir` from disk.
    ///
    /// Symlinks are followed, so a linked directory counts as a directory.
    /// Names that are not valid UTF-8 cannot be quadtree digits and are
    /// dropped.
    pub fn read(dir: &Path) -> io::Result<Self> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let kind = if entry.path().is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(ListingEntry { name, kind });
        }
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &ListingEntry> {
        self.entries.iter().filter(|e| !e.is_dir())
    }

    pub fn directories(&self) -> impl Iterator<Item = &ListingEntry> {
        self.entries.iter().filter(|e| e.is_dir())
    }
}

/// Whether a directory is at the bottom of the pyramid.
///
/// A leaf directory holds no subdirectories at all, whatever their names.
pub fn is_leaf(listing: &Listing) -> bool {
    !listing.entries().iter().any(ListingEntry::is_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_only_is_leaf() {
        let listing = Listing::new(vec![
            ListingEntry::file("0.png"),
            ListingEntry::file("3.png"),
        ]);
        assert!(is_leaf(&listing));
    }

    #[test]
    fn test_empty_directory_is_leaf() {
        assert!(is_leaf(&Listing::default()));
    }

    #[test]
    fn test_any_subdirectory_breaks_leaf() {
        let listing = Listing::new(vec![
            ListingEntry::file("0.png"),
            ListingEntry::file("1.png"),
            ListingEntry::directory("1"),
        ]);
        assert!(!is_leaf(&listing));
    }

    #[test]
    fn test_non_digit_subdirectory_still_breaks_leaf() {
        let listing = Listing::new(vec![
            ListingEntry::file("2.png"),
            ListingEntry::directory("thumbs"),
        ]);
        assert!(!is_leaf(&listing));
    }

    #[test]
    fn test_listing_is_sorted() {
        let listing = Listing::new(vec![
            ListingEntry::file("3.png"),
            ListingEntry::directory("0"),
            ListingEntry::file("1.png"),
        ]);
        let names: Vec<_> = listing.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["0", "1.png", "3.png"]);
        assert_eq!(listing.files().count(), 2);
        assert_eq!(listing.directories().count(), 1);
    }

    #[test]
    fn test_read_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::create_dir(temp.path().join("2")).unwrap();
        fs::write(temp.path().join("2.png"), b"").unwrap();

        let listing = Listing::read(temp.path()).unwrap();

        assert_eq!(
            listing.entries(),
            &[ListingEntry::directory("2"), ListingEntry::file("2.png")]
        );
        assert!(!is_leaf(&listing));
    }
}
