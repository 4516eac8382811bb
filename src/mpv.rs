//! libmpv-backed players. One `Mpv` instance per live pool slot.

use std::time::Duration;

use libmpv2::Mpv;
use tracing::{debug, warn};

use crate::media::MediaEntry;
use crate::player::{Decoder, PlaybackError, Player};

pub struct MpvDecoder {
    hwdec: bool,
}

impl MpvDecoder {
    pub fn new() -> Self {
        MpvDecoder { hwdec: true }
    }
}

impl Default for MpvDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn open_err(entry: &MediaEntry, reason: impl ToString) -> PlaybackError {
    PlaybackError::Open {
        name: entry.display_name.clone(),
        reason: reason.to_string(),
    }
}

impl Decoder for MpvDecoder {
    fn open(&mut self, entry: &MediaEntry) -> Result<Box<dyn Player>, PlaybackError> {
        let path = entry.locator.as_path();
        // mpv reports unreadable files asynchronously; fail fast here instead.
        std::fs::File::open(path).map_err(|e| open_err(entry, e))?;

        let mpv = Mpv::new().map_err(|e| open_err(entry, e))?;
        let target = path.to_string_lossy();
        let setup = || -> libmpv2::Result<()> {
            mpv.set_property("terminal", "no")?;
            mpv.set_property("hwdec", if self.hwdec { "auto" } else { "no" })?;
            mpv.set_property("keep-open", "yes")?;
            mpv.set_property("loop-file", "inf")?;
            mpv.set_property("pause", true)?;
            mpv.command("loadfile", &[target.as_ref()])?;
            Ok(())
        };
        setup().map_err(|e| open_err(entry, e))?;
        debug!("mpv: prepared {}", entry.display_name);
        Ok(Box::new(MpvPlayer { mpv }))
    }
}

struct MpvPlayer {
    mpv: Mpv,
}

impl Player for MpvPlayer {
    fn play(&mut self) {
        if let Err(e) = self.mpv.set_property("pause", false) {
            warn!("mpv: play: {}", e);
        }
    }

    fn pause(&mut self) {
        if let Err(e) = self.mpv.set_property("pause", true) {
            warn!("mpv: pause: {}", e);
        }
    }

    fn seek(&mut self, to: Duration) {
        let secs = format!("{:.3}", to.as_secs_f64());
        if let Err(e) = self.mpv.command("seek", &[&secs, "absolute"]) {
            warn!("mpv: seek {}: {}", secs, e);
        }
    }

    fn position(&self) -> Duration {
        self.mpv
            .get_property::<f64>("time-pos")
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or_default()
    }

    fn duration(&self) -> Option<Duration> {
        self.mpv
            .get_property::<f64>("duration")
            .ok()
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64)
    }
}
