//! Media entries discovered in the granted folder, plus suffix classification.

use std::path::{Path, PathBuf};

use serde::Serialize;

const IMAGE_SUFFIXES: &[&str] = &[".jpg", ".jpeg", ".png"];
const VIDEO_SUFFIXES: &[&str] = &[".mp4"];

/// Content-type marker the document provider reports for sub-folders.
pub const MIME_TYPE_DIR: &str = "vnd.android.document/directory";

/// Name used when the listing reports no display name.
pub const UNNAMED: &str = "Unnamed";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify by filename suffix. Case-sensitive: `IMG.JPG` is not an image.
    pub fn from_name(name: &str) -> Option<Self> {
        if IMAGE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            Some(MediaKind::Image)
        } else if VIDEO_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Wildcard MIME type handed to share targets and the Downloads collection.
    pub fn share_mime(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/*",
            MediaKind::Video => "video/*",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
        }
    }
}

/// Opaque reference to a file in the granted folder.
///
/// Holding a locator owns no OS resource; the file is only opened by the
/// operation that needs its bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Locator(PathBuf);

impl Locator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Locator(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// One file discovered under the granted folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MediaEntry {
    pub locator: Locator,
    pub display_name: String,
    /// Epoch millis. Ordering only; not unique, not monotonic.
    pub last_modified: i64,
    pub mime: Option<String>,
}

impl MediaEntry {
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_name(&self.display_name)
    }

    pub fn is_image(&self) -> bool {
        self.kind() == Some(MediaKind::Image)
    }

    pub fn is_video(&self) -> bool {
        self.kind() == Some(MediaKind::Video)
    }
}

/// Image subset, in listing order.
pub fn images(entries: &[MediaEntry]) -> Vec<MediaEntry> {
    entries.iter().filter(|e| e.is_image()).cloned().collect()
}

/// Video subset, in listing order.
pub fn videos(entries: &[MediaEntry]) -> Vec<MediaEntry> {
    entries.iter().filter(|e| e.is_video()).cloned().collect()
}

/// Pixel dimensions of an image entry, read from its header only.
pub fn image_dimensions(entry: &MediaEntry) -> Option<(u32, u32)> {
    if !entry.is_image() {
        return None;
    }
    image::image_dimensions(entry.locator.as_path()).ok()
}

/// `mm:ss` label for a playback position or duration.
#[cfg_attr(not(feature = "mpv"), allow(dead_code))]
pub fn format_millis(millis: u64) -> String {
    let total_secs = millis / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// UTC timestamp `YYYY-MM-DDTHH:MM:SSZ` for an epoch-millis value.
pub fn iso_lite(epoch_millis: i64) -> String {
    let s = epoch_millis.max(0) as u64 / 1000;
    let days = s / 86400;
    let time = s % 86400;
    let h = time / 3600;
    let m = (time % 3600) / 60;
    let sec = time % 60;

    let mut y = 1970i64;
    let mut remaining = days as i64;
    loop {
        let days_in_year = if is_leap(y) { 366 } else { 365 };
        if remaining < days_in_year {
            break;
        }
        remaining -= days_in_year;
        y += 1;
    }
    let months = [
        31,
        if is_leap(y) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut mo = 1;
    for &ml in &months {
        if remaining < ml {
            break;
        }
        remaining -= ml;
        mo += 1;
    }
    let d = remaining + 1;
    format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", y, mo, d, h, m, sec)
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

#[cfg(test)]
pub(crate) fn entry(name: &str, last_modified: i64) -> MediaEntry {
    MediaEntry {
        locator: Locator::new(format!("/granted/{}", name)),
        display_name: name.to_string(),
        last_modified,
        mime: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── classification ──────────────────────────────────────────────────

    #[test]
    fn image_suffixes() {
        for name in &["a.jpg", "b.jpeg", "c.png", "status.one.jpg"] {
            assert_eq!(MediaKind::from_name(name), Some(MediaKind::Image), "{}", name);
        }
    }

    #[test]
    fn video_suffix() {
        assert_eq!(MediaKind::from_name("clip.mp4"), Some(MediaKind::Video));
    }

    #[test]
    fn classification_is_case_sensitive() {
        assert_eq!(MediaKind::from_name("IMG.JPG"), None);
        assert_eq!(MediaKind::from_name("CLIP.MP4"), None);
        assert_eq!(MediaKind::from_name("shot.Png"), None);
    }

    #[test]
    fn unclassified_names() {
        for name in &[".nomedia", "notes.txt", "clip.mkv", "jpg", "png", "", "a.jpg.tmp"] {
            assert_eq!(MediaKind::from_name(name), None, "{}", name);
        }
    }

    #[test]
    fn subsets_preserve_order_and_exclude_others() {
        let all = vec![
            entry("y.jpg", 300),
            entry("z.png", 200),
            entry("x.mp4", 100),
            entry(".nomedia", 50),
            entry("w.mp4", 10),
        ];
        let imgs: Vec<_> = images(&all).into_iter().map(|e| e.display_name).collect();
        let vids: Vec<_> = videos(&all).into_iter().map(|e| e.display_name).collect();
        assert_eq!(imgs, ["y.jpg", "z.png"]);
        assert_eq!(vids, ["x.mp4", "w.mp4"]);
    }

    #[test]
    fn share_mime_by_kind() {
        assert_eq!(MediaKind::Image.share_mime(), "image/*");
        assert_eq!(MediaKind::Video.share_mime(), "video/*");
    }

    // ── formatting ──────────────────────────────────────────────────────

    #[test]
    fn format_millis_minutes_seconds() {
        assert_eq!(format_millis(0), "00:00");
        assert_eq!(format_millis(999), "00:00");
        assert_eq!(format_millis(61_500), "01:01");
        assert_eq!(format_millis(30 * 60_000 + 5_000), "30:05");
    }

    #[test]
    fn iso_lite_known_dates() {
        assert_eq!(iso_lite(0), "1970-01-01T00:00:00Z");
        assert_eq!(iso_lite(1_704_067_200_000), "2024-01-01T00:00:00Z");
        assert_eq!(iso_lite(1_709_164_800_123), "2024-02-29T00:00:00Z");
        assert_eq!(iso_lite(1_704_067_199_000), "2023-12-31T23:59:59Z");
    }

    #[test]
    fn iso_lite_negative_clamps_to_epoch() {
        assert_eq!(iso_lite(-5), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn dimensions_only_for_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::new(3, 2).save(&path).unwrap();
        let img = MediaEntry {
            locator: Locator::new(&path),
            display_name: "tiny.png".into(),
            last_modified: 0,
            mime: Some("image/png".into()),
        };
        assert_eq!(image_dimensions(&img), Some((3, 2)));

        let vid = MediaEntry {
            display_name: "tiny.mp4".into(),
            ..img
        };
        assert_eq!(image_dimensions(&vid), None);
    }
}
