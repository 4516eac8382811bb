//! CLI subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(feature = "mpv")]
use std::sync::Mutex;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::export;
use crate::grants::Grants;
use crate::library::Library;
use crate::media::{self, iso_lite, MediaEntry};
#[cfg(feature = "mpv")]
use crate::pager;
#[cfg(feature = "mpv")]
use crate::player::{HostEvent, PlayerPool};
use crate::scanner::FsFolder;
use crate::snackbar::{self, ConsolePresenter, SnackbarAction, SnackbarEvent};

pub struct Ctx {
    pub config: Config,
    pub grants: Grants,
    pub folder: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    All,
    Images,
    Videos,
}

impl Filter {
    pub fn from_flags(images: bool, videos: bool) -> Self {
        match (images, videos) {
            (true, _) => Filter::Images,
            (false, true) => Filter::Videos,
            _ => Filter::All,
        }
    }

    fn apply(&self, entries: Vec<MediaEntry>) -> Vec<MediaEntry> {
        match self {
            Filter::All => entries,
            Filter::Images => media::images(&entries),
            Filter::Videos => media::videos(&entries),
        }
    }
}

/// Strip Windows extended-length path prefix (`\\?\`) if present.
fn clean_path(s: &str) -> String {
    s.strip_prefix(r"\\?\").unwrap_or(s).to_string()
}

/// Key a folder is granted under: canonical when it exists, as given otherwise.
fn folder_key(path: &Path) -> String {
    let abs = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    clean_path(&abs.to_string_lossy())
}

fn current_folder(ctx: &Ctx) -> Result<&Path> {
    ctx.folder
        .as_deref()
        .ok_or_else(|| anyhow!("no folder configured and no home directory; pass --folder"))
}

/// The granted folder, or an error telling the user to grant it.
fn granted_folder(ctx: &Ctx) -> Result<FsFolder> {
    let folder = current_folder(ctx)?;
    let key = folder_key(folder);
    if !ctx.grants.has_read(&key)? {
        bail!(
            "Permission to access media is required. Run `ssv grant {}` first.",
            key
        );
    }
    Ok(FsFolder::new(key))
}

/// Load the granted folder off the calling thread.
fn open_library(ctx: &Ctx) -> Result<Arc<Library>> {
    let folder = granted_folder(ctx)?;
    let root = folder.root().to_path_buf();
    let lib = Arc::new(Library::new(folder));
    lib.spawn_reload()
        .join()
        .map_err(|_| anyhow!("listing thread panicked"))?
        .with_context(|| format!("listing {}", root.display()))?;
    Ok(lib)
}

fn load(ctx: &Ctx) -> Result<Vec<MediaEntry>> {
    Ok(open_library(ctx)?.entries())
}

/// Resolve a 1-based index or an exact display name.
fn select<'a>(entries: &'a [MediaEntry], target: &str) -> Option<(usize, &'a MediaEntry)> {
    if let Ok(n) = target.parse::<usize>() {
        if n >= 1 && n <= entries.len() {
            return Some((n - 1, &entries[n - 1]));
        }
    }
    entries
        .iter()
        .enumerate()
        .find(|(_, e)| e.display_name == target)
}

fn select_or_err<'a>(entries: &'a [MediaEntry], target: &str) -> Result<(usize, &'a MediaEntry)> {
    select(entries, target).ok_or_else(|| anyhow!("no item matches {:?}", target))
}

fn mime_of(entry: &MediaEntry) -> String {
    match entry.kind() {
        Some(kind) => kind.share_mime().to_string(),
        None => entry.mime.clone().unwrap_or_else(|| "*/*".to_string()),
    }
}

pub fn grant(ctx: &Ctx, path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => current_folder(ctx)?,
    };
    if !path.is_dir() {
        warn!("grant: {} is not a folder (yet)", path.display());
    }
    let key = folder_key(path);
    ctx.grants.grant(&key)?;
    println!("Access granted to {}", key);
    Ok(())
}

pub fn revoke(ctx: &Ctx, path: &Path) -> Result<()> {
    let key = folder_key(path);
    if ctx.grants.revoke(&key)? {
        println!("Revoked {}", key);
    } else {
        println!("No grant for {}", key);
    }
    Ok(())
}

pub fn status(ctx: &Ctx) -> Result<()> {
    println!("ssv status");
    println!("==========");
    match ctx.folder.as_deref() {
        Some(folder) => {
            let key = folder_key(folder);
            let granted = ctx.grants.has_read(&key)?;
            println!("folder:  {}", key);
            println!("granted: {}", if granted { "yes" } else { "no" });
            if granted {
                let lib = Library::new(FsFolder::new(&key));
                match lib.reload() {
                    Ok(_) => {
                        let all = lib.entries();
                        println!("images:  {}", lib.images().len());
                        println!("videos:  {}", lib.videos().len());
                        println!("other:   {}", all.iter().filter(|e| e.kind().is_none()).count());
                    }
                    Err(e) => println!("error:   {}", e),
                }
            }
        }
        None => println!("folder:  (none)"),
    }

    let grants = ctx.grants.list()?;
    println!("grants:  {}", grants.len());
    for g in &grants {
        println!("  {} (since {})", g.path, g.granted_at);
    }
    Ok(())
}

pub fn list(ctx: &Ctx, filter: Filter, json: bool) -> Result<()> {
    let entries = filter.apply(load(ctx)?);
    if json {
        println!("{}", serde_json::to_string_pretty(&json_rows(&entries))?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No media.");
        return Ok(());
    }
    for (i, e) in entries.iter().enumerate() {
        let kind = e.kind().map(|k| k.label()).unwrap_or("-");
        println!(
            "{:>4}  {:<5}  {}  {}",
            i + 1,
            kind,
            iso_lite(e.last_modified),
            e.display_name
        );
    }
    Ok(())
}

fn json_rows(entries: &[MediaEntry]) -> Vec<serde_json::Value> {
    entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "name": e.display_name,
                "kind": e.kind(),
                "modified": iso_lite(e.last_modified),
                "last_modified": e.last_modified,
                "mime": e.mime,
                "locator": e.locator,
            })
        })
        .collect()
}

pub fn info(ctx: &Ctx, target: &str) -> Result<()> {
    let entries = load(ctx)?;
    let (_, e) = select_or_err(&entries, target)?;
    println!("name:     {}", e.display_name);
    println!(
        "kind:     {}",
        e.kind().map(|k| k.label()).unwrap_or("unclassified")
    );
    println!("mime:     {}", e.mime.as_deref().unwrap_or("-"));
    println!("modified: {}", iso_lite(e.last_modified));
    println!("path:     {}", e.locator.as_path().display());
    if let Ok(meta) = std::fs::metadata(e.locator.as_path()) {
        println!("size:     {} bytes", meta.len());
    }
    if let Some((w, h)) = media::image_dimensions(e) {
        println!("pixels:   {}x{}", w, h);
    }
    Ok(())
}

pub fn save(ctx: &Ctx, target: &str, open: bool) -> Result<()> {
    let entries = load(ctx)?;
    let (_, e) = select_or_err(&entries, target)?;
    let downloads = ctx
        .config
        .downloads_dir()
        .ok_or_else(|| anyhow!("no Downloads folder found; set downloads_dir in config"))?;

    let out = export::download(e.locator.as_path(), &e.display_name, &mime_of(e), &downloads)
        .with_context(|| format!("saving {}", e.display_name))?;
    info!("saved {}", out.display());

    let (tx, host) = snackbar::channel();
    let banner = thread::spawn(move || host.run(&mut ConsolePresenter { perform_actions: open }));

    let what = e.kind().map(|k| k.label()).unwrap_or("File");
    let mime = mime_of(e);
    let command = ctx.config.share_command.clone();
    tx.send(
        SnackbarEvent::new(format!("{} downloaded to the Downloads folder", what)).with_action(
            SnackbarAction::new("Open", move || {
                if let Err(err) = export::share(&out, &mime, &command) {
                    warn!("open {}: {}", out.display(), err);
                }
            }),
        ),
    );
    drop(tx);
    banner.join().map_err(|_| anyhow!("snackbar thread panicked"))
}

pub fn share(ctx: &Ctx, target: &str) -> Result<()> {
    let entries = load(ctx)?;
    let (_, e) = select_or_err(&entries, target)?;
    export::share(
        e.locator.as_path(),
        &mime_of(e),
        &ctx.config.share_command,
    )
    .with_context(|| format!("sharing {}", e.display_name))
}

#[cfg(feature = "mpv")]
pub fn play(ctx: &Ctx, target: Option<&str>) -> Result<()> {
    let library = open_library(ctx)?;
    let videos = library.videos();
    if videos.is_empty() {
        println!("No videos.");
        return Ok(());
    }
    let start = match target {
        Some(t) => select_or_err(&videos, t)?.0,
        None => 0,
    };

    let pool = Arc::new(Mutex::new(PlayerPool::new(
        crate::mpv::MpvDecoder::new(),
        videos,
    )));

    {
        let pool = pool.clone();
        ctrlc::set_handler(move || {
            if let Ok(mut p) = pool.lock() {
                p.on_host_lifecycle(HostEvent::Destroyed);
                p.release_all();
            }
            std::process::exit(130);
        })
        .context("installing Ctrl-C handler")?;
    }

    let stdin = std::io::stdin();
    pager::run(
        pool,
        start,
        stdin.lock(),
        ctx.config.poll_interval(),
        Some(library.as_ref()),
    )
}

#[cfg(not(feature = "mpv"))]
pub fn play(_ctx: &Ctx, _target: Option<&str>) -> Result<()> {
    bail!("video playback needs the `mpv` feature (cargo build --features mpv)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::entry;

    // ── target selection ────────────────────────────────────────────────

    #[test]
    fn select_by_index_and_name() {
        let all = vec![entry("y.jpg", 3), entry("z.png", 2), entry("x.mp4", 1)];
        assert_eq!(select(&all, "1").unwrap().1.display_name, "y.jpg");
        assert_eq!(select(&all, "3").unwrap().0, 2);
        assert_eq!(select(&all, "z.png").unwrap().0, 1);
        assert!(select(&all, "0").is_none());
        assert!(select(&all, "4").is_none());
        assert!(select(&all, "Y.JPG").is_none());
    }

    #[test]
    fn numeric_name_falls_back_to_name_match() {
        let all = vec![entry("a.jpg", 2), entry("7", 1)];
        assert_eq!(select(&all, "7").unwrap().0, 1);
    }

    #[test]
    fn filter_flags() {
        assert_eq!(Filter::from_flags(false, false), Filter::All);
        assert_eq!(Filter::from_flags(true, false), Filter::Images);
        assert_eq!(Filter::from_flags(false, true), Filter::Videos);
        let all = vec![entry("a.jpg", 2), entry("b.mp4", 1), entry("c.txt", 0)];
        assert_eq!(Filter::All.apply(all.clone()).len(), 3);
        assert_eq!(Filter::Videos.apply(all).len(), 1);
    }

    #[test]
    fn mime_prefers_kind_wildcard() {
        let mut e = entry("a.jpg", 0);
        e.mime = Some("image/jpeg".into());
        assert_eq!(mime_of(&e), "image/*");
        let mut other = entry("notes.txt", 0);
        assert_eq!(mime_of(&other), "*/*");
        other.mime = Some("text/plain".into());
        assert_eq!(mime_of(&other), "text/plain");
    }

    #[test]
    fn json_rows_shape() {
        let rows = json_rows(&[entry("x.mp4", 1_704_067_200_000)]);
        assert_eq!(rows[0]["kind"], "video");
        assert_eq!(rows[0]["modified"], "2024-01-01T00:00:00Z");
        assert_eq!(rows[0]["locator"], "/granted/x.mp4");
    }

    #[test]
    fn clean_path_strips_win_prefix() {
        assert_eq!(clean_path(r"\\?\C:\Users\x"), r"C:\Users\x");
        assert_eq!(clean_path("/home/x"), "/home/x");
    }

    // ── grants gate listing ─────────────────────────────────────────────

    fn ctx_for(folder: &Path) -> Ctx {
        Ctx {
            config: Config::default(),
            grants: Grants::open_memory(),
            folder: Some(folder.to_path_buf()),
        }
    }

    #[test]
    fn listing_requires_grant() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        let ctx = ctx_for(dir.path());

        let err = load(&ctx).unwrap_err();
        assert!(err.to_string().contains("Permission to access media is required"));

        grant(&ctx, None).unwrap();
        assert_eq!(load(&ctx).unwrap().len(), 1);

        revoke(&ctx, dir.path()).unwrap();
        assert!(load(&ctx).is_err());
    }

    #[test]
    fn save_copies_into_configured_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let dl = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("y.jpg"), b"img").unwrap();
        let mut ctx = ctx_for(dir.path());
        ctx.config.downloads_dir = Some(dl.path().to_path_buf());
        grant(&ctx, None).unwrap();

        save(&ctx, "y.jpg", false).unwrap();
        assert_eq!(std::fs::read(dl.path().join("y.jpg")).unwrap(), b"img");
        assert!(save(&ctx, "missing.jpg", false).is_err());
    }
}
