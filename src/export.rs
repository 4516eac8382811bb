//! Share and download helpers.
//!
//! Neither wraps I/O errors: callers decide how to report them.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

/// Hand a file to the desktop's "open with / share" handler.
///
/// `command[0]` is the program; `{path}` and `{mime}` in any argument are
/// substituted. Fire-and-forget: the child is not waited on.
pub fn share(locator: &Path, mime: &str, command: &[String]) -> io::Result<()> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty share command"))?;
    let path = locator.to_string_lossy();
    let args: Vec<String> = args
        .iter()
        .map(|a| a.replace("{path}", &path).replace("{mime}", mime))
        .collect();

    debug!("share: {} {:?}", program, args);
    Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    info!("share: {} ({})", locator.display(), mime);
    Ok(())
}

/// Platform default share/open command.
pub fn default_share_command() -> Vec<String> {
    let parts: &[&str] = if cfg!(target_os = "macos") {
        &["open", "{path}"]
    } else if cfg!(windows) {
        &["cmd", "/C", "start", "", "{path}"]
    } else {
        &["xdg-open", "{path}"]
    };
    parts.iter().map(|s| s.to_string()).collect()
}

/// Copy `locator` into `downloads` as `display_name`.
///
/// An existing file is never overwritten: the name gets a ` (1)`, ` (2)`, …
/// suffix before the extension, as the platform media store does. Returns the
/// path written.
pub fn download(
    locator: &Path,
    display_name: &str,
    mime: &str,
    downloads: &Path,
) -> io::Result<PathBuf> {
    let mut src = File::open(locator)?;
    std::fs::create_dir_all(downloads)?;
    let (target, mut dst) = create_unique(downloads, display_name)?;

    let bytes = match io::copy(&mut src, &mut dst) {
        Ok(n) => n,
        Err(e) => {
            drop(dst);
            std::fs::remove_file(&target).ok();
            return Err(e);
        }
    };
    info!(
        "download: {} -> {} ({} bytes, {})",
        locator.display(),
        target.display(),
        bytes,
        mime
    );
    Ok(target)
}

fn create_unique(dir: &Path, name: &str) -> io::Result<(PathBuf, File)> {
    let (stem, ext) = split_name(name);
    for n in 0u32.. {
        let candidate = if n == 0 {
            name.to_string()
        } else {
            format!("{} ({}){}", stem, n, ext)
        };
        let path = dir.join(&candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => return Ok((path, f)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    unreachable!("u32 range exhausted")
}

/// `"clip.final.mp4"` → `("clip.final", ".mp4")`; dotfiles keep their name as stem.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    }
}
