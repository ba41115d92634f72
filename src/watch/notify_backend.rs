// src/watch/notify_backend.rs

//! Production [`NativeFacility`] built on the `notify` crate.
//!
//! `notify` picks the platform backend (FSEvents, inotify, kqueue,
//! ReadDirectoryChangesW) and reports typed [`notify::Event`]s. Those are
//! translated back into [`RawFlags`] so that classification is identical no
//! matter which OS produced the event.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use notify::event::{CreateKind, MetadataKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::errors::{FileWatchError, Result};
use crate::event::RawFlags;
use crate::types::SinceWhen;

use super::native::{
    CreateFlags, EventSink, NativeFacility, NativeSubscription, RawBatch, SubscriptionRequest,
};

/// Facility backed by [`RecommendedWatcher`].
///
/// Roots are watched recursively by default, matching FSEvents, which always
/// reports changes anywhere below a root.
#[derive(Debug, Clone)]
pub struct NotifyFacility {
    recursive: bool,
}

impl Default for NotifyFacility {
    fn default() -> Self {
        Self { recursive: true }
    }
}

impl NotifyFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only report changes to the roots and their direct children.
    pub fn non_recursive(self) -> Self {
        self.with_recursive(false)
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Mode handed to `Watcher::watch` for every root.
    pub fn mode(&self) -> RecursiveMode {
        if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        }
    }
}

impl NativeFacility for NotifyFacility {
    fn create(
        &self,
        request: &SubscriptionRequest,
        sink: EventSink,
    ) -> Result<Box<dyn NativeSubscription>> {
        if let SinceWhen::Historical(id) = request.since {
            return Err(FileWatchError::SubscriptionFailed(format!(
                "the notify backend cannot replay history (since event {id})"
            )));
        }
        if !request.flags.contains(CreateFlags::FILE_EVENTS) {
            debug!("notify always reports file-level events; FILE_EVENTS implied");
        }
        debug!(
            latency = ?request.latency,
            "notify delivers as soon as the OS reports; latency is advisory"
        );

        let armed = Arc::new(AtomicBool::new(false));
        let handler_armed = Arc::clone(&armed);
        let mut translator = EventTranslator::new(request.paths.clone());

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if !handler_armed.load(Ordering::Acquire) {
                    return;
                }
                match res {
                    Ok(event) => sink.deliver_batch(translator.translate(&event)),
                    Err(err) => {
                        warn!(error = %err, paths = ?err.paths, "native watch error");
                    }
                }
            },
            Config::default(),
        )
        .map_err(|e| FileWatchError::SubscriptionFailed(format!("creating notify watcher: {e}")))?;

        Ok(Box::new(NotifySubscription {
            watcher: Some(watcher),
            paths: request.paths.clone(),
            mode: self.mode(),
            watched: Vec::new(),
            armed,
        }))
    }
}

struct NotifySubscription {
    watcher: Option<RecommendedWatcher>,
    paths: Vec<PathBuf>,
    mode: RecursiveMode,
    watched: Vec<PathBuf>,
    armed: Arc<AtomicBool>,
}

impl NotifySubscription {
    fn unwatch_all(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            self.watched.clear();
            return;
        };
        for path in self.watched.drain(..) {
            if let Err(err) = watcher.unwatch(&path) {
                debug!(?path, error = %err, "unwatch failed");
            }
        }
    }
}

impl NativeSubscription for NotifySubscription {
    fn start(&mut self) -> Result<()> {
        let Some(watcher) = self.watcher.as_mut() else {
            return Err(FileWatchError::SubscriptionFailed(
                "subscription was already invalidated".to_string(),
            ));
        };

        let mut failure = None;
        for path in &self.paths {
            match watcher.watch(path, self.mode) {
                Ok(()) => self.watched.push(path.clone()),
                Err(err) => {
                    failure = Some(FileWatchError::SubscriptionFailed(format!(
                        "watching {}: {err}",
                        path.display()
                    )));
                    break;
                }
            }
        }

        if let Some(err) = failure {
            self.unwatch_all();
            return Err(err);
        }

        self.armed.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&mut self) {
        self.armed.store(false, Ordering::Release);
        self.unwatch_all();
    }

    fn invalidate(&mut self) {
        self.armed.store(false, Ordering::Release);
        self.watched.clear();
    }

    fn release(mut self: Box<Self>) {
        // Dropping the watcher shuts down its event thread.
        self.watcher.take();
    }
}

const GRANULARITY: RawFlags = RawFlags::ITEM_IS_FILE
    .union(RawFlags::ITEM_IS_DIR)
    .union(RawFlags::ITEM_IS_SYMLINK);

/// How many completed rename pairs are remembered so a trailing
/// `RenameMode::Both` for the same tracker can be dropped.
const PAIRED_MEMORY: usize = 64;

/// Stateful translation for one subscription's event stream.
///
/// Backends such as inotify report a rename as `From`, then `To`, then
/// `Both`, all sharing a tracker. The old path no longer exists when `From`
/// arrives, so its record is held back until the matching `To` supplies the
/// granularity. The trailing `Both` repeats the pair and is dropped. A
/// `From` whose partner never arrives (the item left the watched tree) is
/// released without granularity ahead of the next event.
///
/// A rescan that names no path is reported once per watched root.
#[derive(Debug, Default)]
pub struct EventTranslator {
    roots: Vec<PathBuf>,
    pending: Vec<(usize, RawBatch)>,
    paired: VecDeque<usize>,
}

impl EventTranslator {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    pub fn translate(&mut self, event: &Event) -> RawBatch {
        let mut out = Vec::new();
        let rename = match event.kind {
            EventKind::Modify(ModifyKind::Name(mode)) => Some(mode),
            _ => None,
        };

        match (rename, event.tracker()) {
            (Some(RenameMode::From), Some(tracker)) => {
                self.flush_pending(&mut out);
                self.pending.push((tracker, translate_event(event)));
            }
            (Some(RenameMode::To), Some(tracker)) => {
                let new_half = translate_event(event);
                match self.take_pending(tracker) {
                    Some(old_half) => {
                        self.flush_pending(&mut out);
                        let borrowed = new_half
                            .iter()
                            .map(|(_, flags)| *flags & GRANULARITY)
                            .find(|g| !g.is_empty())
                            .unwrap_or_else(RawFlags::empty);
                        out.extend(old_half.into_iter().map(|(path, flags)| {
                            if flags.intersects(GRANULARITY) {
                                (path, flags)
                            } else {
                                (path, flags | borrowed)
                            }
                        }));
                        self.remember_pair(tracker);
                    }
                    None => self.flush_pending(&mut out),
                }
                out.extend(new_half);
            }
            (Some(RenameMode::Both), Some(tracker)) => {
                if let Some(pos) = self.paired.iter().position(|t| *t == tracker) {
                    self.paired.remove(pos);
                    self.flush_pending(&mut out);
                } else {
                    // `Both` names both paths, so a held-back half is redundant.
                    self.take_pending(tracker);
                    self.flush_pending(&mut out);
                    out.extend(translate_event(event));
                }
            }
            _ => {
                self.flush_pending(&mut out);
                if event.paths.is_empty() && event.need_rescan() {
                    out.extend(self.roots.iter().map(|root| {
                        let granularity = probe(root).unwrap_or_else(RawFlags::empty);
                        (root.clone(), RawFlags::MUST_SCAN_SUBDIRS | granularity)
                    }));
                } else {
                    out.extend(translate_event(event));
                }
            }
        }
        out
    }

    fn take_pending(&mut self, tracker: usize) -> Option<RawBatch> {
        let pos = self.pending.iter().position(|(t, _)| *t == tracker)?;
        Some(self.pending.remove(pos).1)
    }

    fn flush_pending(&mut self, out: &mut RawBatch) {
        for (_, batch) in self.pending.drain(..) {
            out.extend(batch);
        }
    }

    fn remember_pair(&mut self, tracker: usize) {
        if self.paired.len() == PAIRED_MEMORY {
            self.paired.pop_front();
        }
        self.paired.push_back(tracker);
    }
}

/// Translate one `notify` event into `(path, flags)` pairs, one per path.
///
/// Access events carry no change and produce an empty batch. This looks at
/// the event alone; [`EventTranslator`] adds rename pairing on top.
pub fn translate_event(event: &Event) -> RawBatch {
    let (mut flags, mut granularity) = match event.kind {
        EventKind::Access(_) => return Vec::new(),
        EventKind::Create(kind) => (RawFlags::ITEM_CREATED, create_granularity(kind)),
        EventKind::Remove(kind) => (RawFlags::ITEM_REMOVED, remove_granularity(kind)),
        EventKind::Modify(kind) => (modify_flags(kind), None),
        EventKind::Any | EventKind::Other => (RawFlags::empty(), None),
    };

    if event.need_rescan() {
        flags |= RawFlags::MUST_SCAN_SUBDIRS;
    }

    // When the kind does not say, ask the filesystem. A rename's old path no
    // longer exists, so borrow whatever its sibling path reports.
    let probed: Vec<Option<RawFlags>> = event.paths.iter().map(|p| probe(p)).collect();
    if granularity.is_none() {
        granularity = probed.iter().flatten().next().copied();
    }

    event
        .paths
        .iter()
        .zip(probed)
        .map(|(path, own)| {
            let kind_bits = match (event.kind, own) {
                (EventKind::Create(CreateKind::File | CreateKind::Folder), _)
                | (EventKind::Remove(RemoveKind::File | RemoveKind::Folder), _) => granularity,
                (_, Some(own)) => Some(own),
                (_, None) => granularity,
            };
            (path.clone(), flags | kind_bits.unwrap_or_else(RawFlags::empty))
        })
        .collect()
}

fn create_granularity(kind: CreateKind) -> Option<RawFlags> {
    match kind {
        CreateKind::File => Some(RawFlags::ITEM_IS_FILE),
        CreateKind::Folder => Some(RawFlags::ITEM_IS_DIR),
        CreateKind::Any | CreateKind::Other => None,
    }
}

fn remove_granularity(kind: RemoveKind) -> Option<RawFlags> {
    match kind {
        RemoveKind::File => Some(RawFlags::ITEM_IS_FILE),
        RemoveKind::Folder => Some(RawFlags::ITEM_IS_DIR),
        RemoveKind::Any | RemoveKind::Other => None,
    }
}

fn modify_flags(kind: ModifyKind) -> RawFlags {
    match kind {
        ModifyKind::Name(_) => RawFlags::ITEM_RENAMED,
        ModifyKind::Metadata(MetadataKind::Extended) => RawFlags::ITEM_XATTR_MOD,
        ModifyKind::Metadata(MetadataKind::Ownership) => RawFlags::ITEM_CHANGE_OWNER,
        ModifyKind::Metadata(_) => RawFlags::ITEM_INODE_META_MOD,
        ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other => RawFlags::ITEM_MODIFIED,
    }
}

/// Granularity bits for whatever currently sits at `path`.
fn probe(path: &Path) -> Option<RawFlags> {
    let meta = std::fs::symlink_metadata(path).ok()?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        Some(RawFlags::ITEM_IS_SYMLINK)
    } else if file_type.is_dir() {
        Some(RawFlags::ITEM_IS_DIR)
    } else {
        Some(RawFlags::ITEM_IS_FILE)
    }
}
