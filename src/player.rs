//! Bounded pool of lazily created video players.
//!
//! Each video in display order gets one slot. A slot's native player is only
//! created when the user plays (or previews) it, and is dropped again once the
//! focused index moves more than [`RELEASE_DISTANCE`] away. At most one slot
//! is ever `Playing`.
//!
//! The native side sits behind two traits so the pool can be driven by libmpv
//! in the binary and by a counting fake in tests:
//!   - [`Decoder`] opens and prepares a locator (does not start playback)
//!   - [`Player`] is the prepared instance; dropping it frees the native resource

// The pager that drives playback only exists in `mpv` builds.
#![cfg_attr(not(feature = "mpv"), allow(dead_code))]

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::media::MediaEntry;

/// Slots farther than this from the focus hold no native player.
pub const RELEASE_DISTANCE: usize = 3;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("no video at index {0}")]
    IndexOutOfRange(usize),

    #[error("cannot open {name}: {reason}")]
    Open { name: String, reason: String },
}

/// A prepared native player instance.
pub trait Player: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, to: Duration);
    fn position(&self) -> Duration;
    /// `None` until the media is prepared far enough to know its length.
    fn duration(&self) -> Option<Duration>;
}

/// Factory for native players.
pub trait Decoder: Send {
    /// Allocate a player, bind it to `entry`, prepare it with loop-one
    /// repeat mode, and leave it paused.
    fn open(&mut self, entry: &MediaEntry) -> Result<Box<dyn Player>, PlaybackError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Uninitialized,
    Ready,
    Playing,
    Paused,
    Released,
}

impl PlayerState {
    /// Whether a native instance exists in this state.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            PlayerState::Ready | PlayerState::Playing | PlayerState::Paused
        )
    }
}

/// Host application lifecycle transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    Created,
    Started,
    Resumed,
    Paused,
    Stopped,
    Destroyed,
}

/// Sampled playback position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub position: Duration,
    pub duration: Duration,
    /// `position / duration`, clamped to `[0, 1]`.
    pub fraction: f32,
}

/// State machine around at most one native player.
struct PlayerHandle {
    state: PlayerState,
    player: Option<Box<dyn Player>>,
}

impl PlayerHandle {
    fn new() -> Self {
        PlayerHandle {
            state: PlayerState::Uninitialized,
            player: None,
        }
    }

    /// Live player, if any. Never hands out a released instance.
    fn live(&mut self) -> Option<&mut Box<dyn Player>> {
        if self.state.is_live() {
            self.player.as_mut()
        } else {
            None
        }
    }

    fn ensure(&mut self, decoder: &mut dyn Decoder, entry: &MediaEntry) -> Result<(), PlaybackError> {
        if self.state.is_live() {
            return Ok(());
        }
        match decoder.open(entry) {
            Ok(player) => {
                self.player = Some(player);
                self.state = PlayerState::Ready;
                Ok(())
            }
            Err(e) => {
                self.player = None;
                self.state = PlayerState::Uninitialized;
                Err(e)
            }
        }
    }

    fn play(&mut self) {
        if let Some(p) = self.live() {
            p.play();
            self.state = PlayerState::Playing;
        }
    }

    fn pause(&mut self) -> bool {
        if self.state != PlayerState::Playing {
            return false;
        }
        if let Some(p) = self.player.as_mut() {
            p.pause();
        }
        self.state = PlayerState::Paused;
        true
    }

    /// Drop the native instance. Returns whether one existed.
    fn release(&mut self) -> bool {
        self.state = PlayerState::Released;
        self.player.take().is_some()
    }
}

struct Slot {
    entry: MediaEntry,
    handle: PlayerHandle,
}

/// Player slots index-aligned with the displayed video list.
pub struct PlayerPool<D: Decoder> {
    decoder: D,
    slots: Vec<Slot>,
    focus: Option<usize>,
}

impl<D: Decoder> PlayerPool<D> {
    pub fn new(decoder: D, videos: Vec<MediaEntry>) -> Self {
        PlayerPool {
            decoder,
            slots: videos
                .into_iter()
                .map(|entry| Slot {
                    entry,
                    handle: PlayerHandle::new(),
                })
                .collect(),
            focus: None,
        }
    }

    /// Replace the video list after a refresh. Every existing player is released.
    pub fn reset(&mut self, videos: Vec<MediaEntry>) {
        self.release_all();
        self.slots = videos
            .into_iter()
            .map(|entry| Slot {
                entry,
                handle: PlayerHandle::new(),
            })
            .collect();
        self.focus = None;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn entry(&self, index: usize) -> Option<&MediaEntry> {
        self.slots.get(index).map(|s| &s.entry)
    }

    pub fn state(&self, index: usize) -> Option<PlayerState> {
        self.slots.get(index).map(|s| s.handle.state)
    }

    /// Index of the playing slot, if any.
    pub fn playing(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.handle.state == PlayerState::Playing)
    }

    /// Number of slots currently holding a native player.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.handle.state.is_live()).count()
    }

    /// Move the focus: pause everything else, release everything outside the
    /// window. Does not start playback at `index`.
    pub fn set_focus(&mut self, index: usize) {
        self.focus = Some(index);
        let mut released = 0usize;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i != index && slot.handle.pause() {
                debug!("pool: paused {} (focus moved to {})", i, index);
            }
            if i.abs_diff(index) > RELEASE_DISTANCE && slot.handle.release() {
                released += 1;
            }
        }
        if released > 0 {
            debug!("pool: focus {} released {} players", index, released);
        }
    }

    fn check(&self, index: usize) -> Result<(), PlaybackError> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(PlaybackError::IndexOutOfRange(index))
        }
    }

    /// Create the player for `index` if needed and rewind it, without playing.
    pub fn prepare(&mut self, index: usize) -> Result<(), PlaybackError> {
        self.check(index)?;
        let slot = &mut self.slots[index];
        if let Err(e) = slot.handle.ensure(&mut self.decoder, &slot.entry) {
            warn!("pool: {}", e);
            return Err(e);
        }
        if let Some(p) = slot.handle.live() {
            p.seek(Duration::ZERO);
        }
        Ok(())
    }

    /// Start playback at `index`, focusing it first.
    pub fn play(&mut self, index: usize) -> Result<(), PlaybackError> {
        self.check(index)?;
        if self.focus != Some(index) {
            self.set_focus(index);
        }
        // set_focus never pauses the focused slot; another may still be playing
        // if focus was already here.
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i != index {
                slot.handle.pause();
            }
        }

        let slot = &mut self.slots[index];
        if let Err(e) = slot.handle.ensure(&mut self.decoder, &slot.entry) {
            warn!("pool: {}", e);
            return Err(e);
        }
        slot.handle.play();
        info!("pool: playing {} ({})", index, slot.entry.display_name);
        Ok(())
    }

    /// Pause `index` if it is playing; anything else is a no-op.
    pub fn pause(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.handle.pause();
        }
    }

    /// Play/pause button: pause if playing, otherwise play.
    pub fn toggle(&mut self, index: usize) -> Result<(), PlaybackError> {
        if self.state(index) == Some(PlayerState::Playing) {
            self.pause(index);
            Ok(())
        } else {
            self.play(index)
        }
    }

    /// Drop the native player at `index`. Idempotent.
    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.handle.release() {
                debug!("pool: released {}", index);
            }
        }
    }

    pub fn release_all(&mut self) {
        let mut n = 0;
        for slot in &mut self.slots {
            if slot.handle.release() {
                n += 1;
            }
        }
        if n > 0 {
            debug!("pool: released all ({} live)", n);
        }
    }

    /// Pause on background/stop/destroy; resources stay warm.
    pub fn on_host_lifecycle(&mut self, event: HostEvent) {
        match event {
            HostEvent::Paused | HostEvent::Stopped | HostEvent::Destroyed => {
                for slot in &mut self.slots {
                    slot.handle.pause();
                }
                debug!("pool: host {:?}, playback paused", event);
            }
            HostEvent::Created | HostEvent::Started | HostEvent::Resumed => {}
        }
    }

    /// Jump to `fraction` of the total duration. Returns false (and does
    /// nothing) when there is no live player, its duration is unknown, or
    /// `fraction` is not finite.
    pub fn seek(&mut self, index: usize, fraction: f32) -> bool {
        if !fraction.is_finite() {
            return false;
        }
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        let Some(p) = slot.handle.live() else {
            return false;
        };
        let Some(total) = p.duration().filter(|d| !d.is_zero()) else {
            return false;
        };
        let target = total.mul_f32(fraction.clamp(0.0, 1.0));
        p.seek(target);
        true
    }

    /// Polling read of the position at `index`.
    pub fn progress(&mut self, index: usize) -> Option<Progress> {
        let p = self.slots.get_mut(index)?.handle.live()?;
        let duration = p.duration().filter(|d| !d.is_zero())?;
        let position = p.position().min(duration);
        Some(Progress {
            position,
            duration,
            fraction: (position.as_secs_f64() / duration.as_secs_f64()) as f32,
        })
    }
}

impl<D: Decoder> Drop for PlayerPool<D> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Counting fake decoder shared by pool and ticker tests.

    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub struct Counters {
        pub opened: AtomicUsize,
        pub dropped: AtomicUsize,
        pub seeks: Mutex<Vec<Duration>>,
    }

    impl Counters {
        pub fn live(&self) -> usize {
            self.opened.load(Ordering::SeqCst) - self.dropped.load(Ordering::SeqCst)
        }
    }

    pub struct FakePlayer {
        counters: Arc<Counters>,
        position: Duration,
        duration: Option<Duration>,
    }

    impl Player for FakePlayer {
        fn play(&mut self) {
            self.position += Duration::from_millis(250);
        }
        fn pause(&mut self) {}
        fn seek(&mut self, to: Duration) {
            self.position = to;
            self.counters.seeks.lock().unwrap().push(to);
        }
        fn position(&self) -> Duration {
            self.position
        }
        fn duration(&self) -> Option<Duration> {
            self.duration
        }
    }

    impl Drop for FakePlayer {
        fn drop(&mut self) {
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    pub struct FakeDecoder {
        pub counters: Arc<Counters>,
        /// Display names that fail to open.
        pub broken: HashSet<String>,
        /// Display names whose duration is unknown.
        pub unprepared: HashSet<String>,
    }

    impl Decoder for FakeDecoder {
        fn open(&mut self, entry: &MediaEntry) -> Result<Box<dyn Player>, PlaybackError> {
            if self.broken.contains(&entry.display_name) {
                return Err(PlaybackError::Open {
                    name: entry.display_name.clone(),
                    reason: "unsupported codec".into(),
                });
            }
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let duration = if self.unprepared.contains(&entry.display_name) {
                None
            } else {
                Some(Duration::from_secs(10))
            };
            Ok(Box::new(FakePlayer {
                counters: self.counters.clone(),
                position: Duration::ZERO,
                duration,
            }))
        }
    }

    pub fn videos(n: usize) -> Vec<MediaEntry> {
        (0..n)
            .map(|i| crate::media::entry(&format!("v{}.mp4", i), 1000 - i as i64))
            .collect()
    }

    pub fn pool(n: usize) -> (PlayerPool<FakeDecoder>, Arc<Counters>) {
        let decoder = FakeDecoder::default();
        let counters = decoder.counters.clone();
        (PlayerPool::new(decoder, videos(n)), counters)
    }
}
