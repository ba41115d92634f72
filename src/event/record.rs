// src/event/record.rs

use std::fmt;
use std::path::{Path, PathBuf};

use super::flags::{describe, Classification, EventKind, RawFlags};

/// A single delivered change: the affected path plus its raw flags.
///
/// Records are built once per `(path, flags)` pair handed over by the native
/// facility and passed to the event callback by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    path: PathBuf,
    flags: RawFlags,
}

impl EventRecord {
    pub fn new(path: impl Into<PathBuf>, flags: RawFlags) -> Self {
        Self {
            path: path.into(),
            flags,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flags(&self) -> RawFlags {
        self.flags
    }

    pub fn classification(&self) -> Classification {
        Classification::of(self.flags)
    }

    /// Winning CRUD verb, see [`Classification::kind`].
    pub fn kind(&self) -> Option<EventKind> {
        self.classification().kind()
    }

    pub fn is_file(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_IS_FILE)
    }

    pub fn is_directory(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_IS_DIR)
    }

    pub fn is_symlink(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_IS_SYMLINK)
    }

    pub fn created(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_CREATED)
    }

    pub fn removed(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_REMOVED)
    }

    /// Renames and moves share this bit.
    pub fn renamed(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_RENAMED)
    }

    pub fn modified(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_MODIFIED)
    }

    /// Extended attributes (e.g. Finder tags) changed.
    pub fn xattr_changed(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_XATTR_MOD)
    }

    pub fn inode_meta_changed(&self) -> bool {
        self.flags.contains(RawFlags::ITEM_INODE_META_MOD)
    }

    /// The facility lost track of changes below this path; callers that keep
    /// their own view of the tree should rescan it.
    pub fn must_rescan(&self) -> bool {
        self.flags.intersects(
            RawFlags::MUST_SCAN_SUBDIRS
                | RawFlags::USER_DROPPED
                | RawFlags::KERNEL_DROPPED
                | RawFlags::ROOT_CHANGED,
        )
    }

    pub fn file_created(&self) -> bool {
        self.classification().file_created()
    }

    pub fn file_removed(&self) -> bool {
        self.classification().file_removed()
    }

    pub fn file_renamed(&self) -> bool {
        self.classification().file_renamed()
    }

    pub fn file_modified(&self) -> bool {
        self.classification().file_modified()
    }

    pub fn dir_created(&self) -> bool {
        self.classification().dir_created()
    }

    pub fn dir_removed(&self) -> bool {
        self.classification().dir_removed()
    }

    pub fn dir_renamed(&self) -> bool {
        self.classification().dir_renamed()
    }

    pub fn dir_modified(&self) -> bool {
        self.classification().dir_modified()
    }

    pub fn description(&self) -> String {
        describe(&self.path, self.flags)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_created_record_reads_naturally() {
        let record = EventRecord::new(
            "/tmp/watch/a.txt",
            RawFlags::ITEM_IS_FILE | RawFlags::ITEM_CREATED,
        );
        assert!(record.file_created());
        assert!(!record.dir_created());
        assert_eq!(record.kind(), Some(EventKind::Created));
        assert_eq!(record.to_string(), "The file /tmp/watch/a.txt was created");
    }

    #[test]
    fn rescan_bits_are_surfaced() {
        let record = EventRecord::new("/tmp/watch", RawFlags::MUST_SCAN_SUBDIRS);
        assert!(record.must_rescan());
        assert_eq!(record.description(), "The directory /tmp/watch was");

        let plain = EventRecord::new("/tmp/watch", RawFlags::ITEM_IS_DIR);
        assert!(!plain.must_rescan());
    }

    #[test]
    fn symlink_record_reads_as_directory() {
        let record = EventRecord::new(
            "/tmp/watch/link",
            RawFlags::ITEM_IS_SYMLINK | RawFlags::ITEM_REMOVED,
        );
        assert!(record.is_symlink());
        assert!(!record.is_file());
        assert!(!record.is_directory());
        assert!(!record.file_removed());
        assert!(!record.dir_removed());
        assert_eq!(record.description(), "The directory /tmp/watch/link was removed");
    }

    #[test]
    fn inode_metadata_change_is_not_a_modification() {
        let record = EventRecord::new(
            "/tmp/watch/a.txt",
            RawFlags::ITEM_IS_FILE | RawFlags::ITEM_INODE_META_MOD,
        );
        assert!(record.inode_meta_changed());
        assert!(!record.modified());
        assert!(!record.xattr_changed());
        assert_eq!(record.kind(), None);
        assert_eq!(record.description(), "The file /tmp/watch/a.txt was");

        let touched = EventRecord::new("/tmp/watch/a.txt", RawFlags::ITEM_MODIFIED);
        assert!(!touched.inode_meta_changed());
    }
}
