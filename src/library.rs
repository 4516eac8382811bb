//! The displayed media list for one granted folder.
//!
//! Initial load and pull-to-refresh go through the same `reload`, guarded by
//! a single busy flag: a reload requested while another is in flight is
//! skipped instead of interleaving two list replacements.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::media::{self, MediaEntry};
use crate::scanner::{self, FolderSource, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    /// The list was replaced with this many entries.
    Replaced(usize),
    /// Another reload was already running.
    Skipped,
}

pub struct Library {
    source: Box<dyn FolderSource + Send + Sync>,
    entries: Mutex<Vec<MediaEntry>>,
    busy: AtomicBool,
}

/// Clears the busy flag when the reload ends, including on error.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Library {
    pub fn new(source: impl FolderSource + Send + Sync + 'static) -> Self {
        Library {
            source: Box::new(source),
            entries: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// Loading/refreshing indicator.
    #[allow(dead_code)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Re-enumerate the folder and replace the list.
    ///
    /// On error the previous list is kept.
    pub fn reload(&self) -> Result<Reload, ScanError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("library: reload already running, skipped");
            return Ok(Reload::Skipped);
        }
        let _guard = BusyGuard(&self.busy);

        let t0 = Instant::now();
        let fresh = scanner::enumerate(self.source.as_ref()).inspect_err(|e| {
            warn!("library: reload failed: {}", e);
        })?;
        let n = fresh.len();
        *self.entries.lock().unwrap_or_else(|p| p.into_inner()) = fresh;
        info!(
            "library: loaded {} items in {} ms",
            n,
            t0.elapsed().as_millis()
        );
        Ok(Reload::Replaced(n))
    }

    /// Run `reload` on a background thread.
    pub fn spawn_reload(self: &Arc<Self>) -> JoinHandle<Result<Reload, ScanError>> {
        let lib = Arc::clone(self);
        thread::spawn(move || lib.reload())
    }

    pub fn entries(&self) -> Vec<MediaEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn images(&self) -> Vec<MediaEntry> {
        media::images(&self.entries())
    }

    pub fn videos(&self) -> Vec<MediaEntry> {
        media::videos(&self.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{Locator, MIME_TYPE_DIR};
    use crate::scanner::ChildDoc;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::Duration;

    fn doc(name: &str, t: i64) -> ChildDoc {
        ChildDoc {
            locator: Locator::new(format!("/tree/{}", name)),
            display_name: Some(name.to_string()),
            last_modified: t,
            mime: None,
        }
    }

    /// Listing that changes between calls.
    struct Shifting(Mutex<Vec<Vec<ChildDoc>>>);

    impl FolderSource for Shifting {
        fn list_children(&self) -> Result<Vec<ChildDoc>, ScanError> {
            let mut rounds = self.0.lock().unwrap();
            if rounds.is_empty() {
                return Err(ScanError::NotFound(PathBuf::from("/tree")));
            }
            Ok(rounds.remove(0))
        }
    }

    /// Listing that blocks until released, to hold a reload in flight.
    struct Gated {
        entered: Mutex<mpsc::Sender<()>>,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl FolderSource for Gated {
        fn list_children(&self) -> Result<Vec<ChildDoc>, ScanError> {
            self.entered.lock().unwrap().send(()).ok();
            self.gate.lock().unwrap().recv().ok();
            Ok(vec![doc("a.jpg", 1)])
        }
    }

    #[test]
    fn reload_replaces_list() {
        let lib = Library::new(Shifting(Mutex::new(vec![
            vec![doc("x.mp4", 100), doc("y.jpg", 300), doc("z.png", 200)],
            vec![doc("new.jpg", 400)],
        ])));
        assert!(lib.entries().is_empty());

        assert_eq!(lib.reload().unwrap(), Reload::Replaced(3));
        assert_eq!(lib.images().len(), 2);
        assert_eq!(lib.videos().len(), 1);
        assert_eq!(lib.entries()[0].display_name, "y.jpg");

        assert_eq!(lib.reload().unwrap(), Reload::Replaced(1));
        assert_eq!(lib.entries()[0].display_name, "new.jpg");
        assert!(lib.videos().is_empty());
    }

    #[test]
    fn failed_reload_keeps_previous_list_and_clears_busy() {
        let lib = Library::new(Shifting(Mutex::new(vec![vec![doc("a.jpg", 1)]])));
        lib.reload().unwrap();
        assert!(matches!(lib.reload(), Err(ScanError::NotFound(_))));
        assert_eq!(lib.entries().len(), 1);
        assert!(!lib.is_busy());
    }

    #[test]
    fn directories_filtered_through_library() {
        let mut dir = doc("sub", 9);
        dir.mime = Some(MIME_TYPE_DIR.into());
        let lib = Library::new(Shifting(Mutex::new(vec![vec![dir, doc("b.mp4", 1)]])));
        lib.reload().unwrap();
        assert_eq!(lib.entries().len(), 1);
    }

    #[test]
    fn overlapping_reload_is_skipped() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let lib = Arc::new(Library::new(Gated {
            entered: Mutex::new(entered_tx),
            gate: Mutex::new(gate_rx),
        }));

        let first = lib.spawn_reload();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(lib.is_busy());

        // Refresh while initial load is in flight.
        assert_eq!(lib.reload().unwrap(), Reload::Skipped);

        gate_tx.send(()).unwrap();
        assert_eq!(first.join().unwrap().unwrap(), Reload::Replaced(1));
        assert!(!lib.is_busy());
    }
}
