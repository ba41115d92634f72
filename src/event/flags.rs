// src/event/flags.rs

//! Decoding of raw change-notification flags.
//!
//! The bit values are the FSEvents `kFSEventStreamEventFlag*` constants.
//! Backends for other platforms translate their native events into this same
//! table, so everything below the table is OS independent.

use std::fmt;
use std::path::Path;

use bitflags::bitflags;

bitflags! {
    /// Raw flag bitmask delivered with a single event.
    ///
    /// Unknown bits are kept as-is; decoding never fails.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RawFlags: u32 {
        const MUST_SCAN_SUBDIRS    = 0x0000_0001;
        const USER_DROPPED         = 0x0000_0002;
        const KERNEL_DROPPED       = 0x0000_0004;
        const EVENT_IDS_WRAPPED    = 0x0000_0008;
        const HISTORY_DONE         = 0x0000_0010;
        const ROOT_CHANGED         = 0x0000_0020;
        const MOUNT                = 0x0000_0040;
        const UNMOUNT              = 0x0000_0080;
        const ITEM_CREATED         = 0x0000_0100;
        const ITEM_REMOVED         = 0x0000_0200;
        const ITEM_INODE_META_MOD  = 0x0000_0400;
        const ITEM_RENAMED         = 0x0000_0800;
        const ITEM_MODIFIED        = 0x0000_1000;
        const ITEM_FINDER_INFO_MOD = 0x0000_2000;
        const ITEM_CHANGE_OWNER    = 0x0000_4000;
        const ITEM_XATTR_MOD       = 0x0000_8000;
        const ITEM_IS_FILE         = 0x0001_0000;
        const ITEM_IS_DIR          = 0x0002_0000;
        const ITEM_IS_SYMLINK      = 0x0004_0000;
    }
}

impl RawFlags {
    /// Wrap a native bitmask without dropping unknown bits.
    pub const fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }
}

/// The CRUD verb an event is reported under.
///
/// When several CRUD bits are set at once, the winner follows
/// `Removed > Created > Renamed > Modified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Removed,
    Created,
    /// Moves are reported under the same native bit and land here too.
    Renamed,
    Modified,
}

impl EventKind {
    pub fn verb(self) -> &'static str {
        match self {
            EventKind::Removed => "removed",
            EventKind::Created => "created",
            EventKind::Renamed => "renamed",
            EventKind::Modified => "modified",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Snapshot of every predicate decoded from a [`RawFlags`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_file: bool,
    pub is_directory: bool,
    pub created: bool,
    pub removed: bool,
    pub renamed: bool,
    pub modified: bool,
    pub xattr_changed: bool,
}

impl Classification {
    /// Decode `flags` with one independent bit test per predicate.
    pub fn of(flags: RawFlags) -> Self {
        Self {
            is_file: flags.contains(RawFlags::ITEM_IS_FILE),
            is_directory: flags.contains(RawFlags::ITEM_IS_DIR),
            created: flags.contains(RawFlags::ITEM_CREATED),
            removed: flags.contains(RawFlags::ITEM_REMOVED),
            renamed: flags.contains(RawFlags::ITEM_RENAMED),
            modified: flags.contains(RawFlags::ITEM_MODIFIED),
            xattr_changed: flags.contains(RawFlags::ITEM_XATTR_MOD),
        }
    }

    pub fn file_created(&self) -> bool {
        self.is_file && self.created
    }

    pub fn file_removed(&self) -> bool {
        self.is_file && self.removed
    }

    pub fn file_renamed(&self) -> bool {
        self.is_file && self.renamed
    }

    pub fn file_modified(&self) -> bool {
        self.is_file && self.modified
    }

    pub fn dir_created(&self) -> bool {
        self.is_directory && self.created
    }

    pub fn dir_removed(&self) -> bool {
        self.is_directory && self.removed
    }

    pub fn dir_renamed(&self) -> bool {
        self.is_directory && self.renamed
    }

    pub fn dir_modified(&self) -> bool {
        self.is_directory && self.modified
    }

    /// The CRUD verb that wins under the description priority, if any.
    pub fn kind(&self) -> Option<EventKind> {
        if self.removed {
            Some(EventKind::Removed)
        } else if self.created {
            Some(EventKind::Created)
        } else if self.renamed {
            Some(EventKind::Renamed)
        } else if self.modified {
            Some(EventKind::Modified)
        } else {
            None
        }
    }

    /// Noun used in descriptions.
    ///
    /// Anything without the file bit is called a directory, including events
    /// that carry neither granularity bit (e.g. root volume events).
    pub fn noun(&self) -> &'static str {
        if self.is_file { "file" } else { "directory" }
    }
}

/// Decode `flags` into a [`Classification`].
pub fn classify(flags: RawFlags) -> Classification {
    Classification::of(flags)
}

/// Human readable summary, e.g. `The file /tmp/a.txt was created`.
///
/// With no CRUD bit set the sentence stops at "was".
pub fn describe(path: &Path, flags: RawFlags) -> String {
    let class = Classification::of(flags);
    let mut out = format!("The {} {} was", class.noun(), path.display());
    if let Some(kind) = class.kind() {
        out.push(' ');
        out.push_str(kind.verb());
    }
    out
}
