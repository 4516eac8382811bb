//! Line-driven video pager: one page per video, the preview screen without
//! the pixels. Reads commands from any `BufRead` so it can be scripted.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::library::{Library, Reload};
use crate::media::format_millis;
use crate::player::{Decoder, HostEvent, PlayerPool, PlayerState};
use crate::snackbar::{self, ConsolePresenter, SnackbarEvent, SnackbarSender};
use crate::ticker::ProgressTicker;

/// One line of pager input.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PagerCmd {
    Next,
    Prev,
    Toggle,
    Seek(f32),
    Refresh,
    Background,
    Foreground,
    Quit,
}

impl PagerCmd {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let cmd = match parts.next() {
            None => return Some(PagerCmd::Toggle),
            Some(c) => c,
        };
        match cmd {
            "n" | "next" => Some(PagerCmd::Next),
            "p" | "prev" => Some(PagerCmd::Prev),
            "t" | "toggle" => Some(PagerCmd::Toggle),
            "s" | "seek" => parts
                .next()?
                .parse::<f32>()
                .ok()
                .filter(|f| f.is_finite())
                .map(PagerCmd::Seek),
            "r" | "refresh" => Some(PagerCmd::Refresh),
            "bg" => Some(PagerCmd::Background),
            "fg" => Some(PagerCmd::Foreground),
            "q" | "quit" => Some(PagerCmd::Quit),
            _ => None,
        }
    }
}

const PAGER_HELP: &str =
    "commands: n(ext) p(rev) t(oggle)/<enter> s(eek) 0..1 r(efresh) bg fg q(uit)";

/// Drive the pool from line commands: the preview pager without the pixels.
///
/// Showing a page focuses and prepares its player (rewound to 0). Playback
/// only starts on toggle. Refresh re-lists the folder and rebuilds the pool.
/// Leaving the pager releases everything.
pub fn run<D: Decoder + 'static>(
    pool: Arc<Mutex<PlayerPool<D>>>,
    start: usize,
    input: impl BufRead,
    interval: Duration,
    library: Option<&Library>,
) -> Result<()> {
    let mut len = pool.lock().map_err(|_| anyhow!("player pool poisoned"))?.len();
    if len == 0 {
        return Ok(());
    }
    let mut page = start.min(len - 1);
    let mut ticker: Option<ProgressTicker> = None;
    let (notes, host) = snackbar::channel();
    let mut console = ConsolePresenter {
        perform_actions: false,
    };

    show_page(&pool, page, &notes)?;
    println!("{}", PAGER_HELP);

    for line in input.lines() {
        host.pump(&mut console);
        let line = line?;
        let Some(cmd) = PagerCmd::parse(&line) else {
            println!("{}", PAGER_HELP);
            continue;
        };

        let mut p = pool.lock().map_err(|_| anyhow!("player pool poisoned"))?;
        match cmd {
            PagerCmd::Next | PagerCmd::Prev => {
                let to = match cmd {
                    PagerCmd::Next => (page + 1).min(len - 1),
                    _ => page.saturating_sub(1),
                };
                if to == page {
                    continue;
                }
                page = to;
                drop(p);
                ticker = None;
                show_page(&pool, page, &notes)?;
            }
            PagerCmd::Toggle => {
                if let Err(e) = p.toggle(page) {
                    notes.send(SnackbarEvent::new(e.to_string()));
                } else {
                    let playing = p.state(page) == Some(PlayerState::Playing);
                    drop(p);
                    ticker = None;
                    if playing {
                        ticker = Some(start_progress(&pool, page, interval));
                    }
                }
            }
            PagerCmd::Seek(fraction) => {
                if !p.seek(page, fraction) {
                    notes.send(SnackbarEvent::new("cannot seek yet"));
                }
            }
            PagerCmd::Refresh => {
                let Some(lib) = library else { continue };
                let current = p.entry(page).map(|e| e.display_name.clone());
                drop(p);
                ticker = None;
                match lib.reload() {
                    Ok(Reload::Replaced(_)) => {
                        let videos = lib.videos();
                        let same = current
                            .and_then(|name| videos.iter().position(|e| e.display_name == name));
                        let mut p = pool.lock().map_err(|_| anyhow!("player pool poisoned"))?;
                        p.reset(videos);
                        len = p.len();
                        drop(p);
                        if len == 0 {
                            println!("No videos.");
                            break;
                        }
                        page = same.unwrap_or(0);
                        show_page(&pool, page, &notes)?;
                    }
                    Ok(Reload::Skipped) => {
                        notes.send(SnackbarEvent::new("refresh already running"));
                    }
                    Err(e) => {
                        notes.send(SnackbarEvent::new(e.to_string()));
                    }
                }
            }
            PagerCmd::Background => p.on_host_lifecycle(HostEvent::Stopped),
            PagerCmd::Foreground => p.on_host_lifecycle(HostEvent::Resumed),
            PagerCmd::Quit => break,
        }
        host.pump(&mut console);
    }

    drop(ticker);
    host.shutdown();
    let mut p = pool.lock().map_err(|_| anyhow!("player pool poisoned"))?;
    p.on_host_lifecycle(HostEvent::Destroyed);
    p.release_all();
    Ok(())
}

fn show_page<D: Decoder>(
    pool: &Arc<Mutex<PlayerPool<D>>>,
    page: usize,
    notes: &SnackbarSender,
) -> Result<()> {
    let mut p = pool.lock().map_err(|_| anyhow!("player pool poisoned"))?;
    p.set_focus(page);
    if let Err(e) = p.prepare(page) {
        notes.send(SnackbarEvent::new(e.to_string()));
    }
    if let Some(e) = p.entry(page) {
        println!("[{}/{}] {}", page + 1, p.len(), e.display_name);
    }
    Ok(())
}

fn start_progress<D: Decoder + 'static>(
    pool: &Arc<Mutex<PlayerPool<D>>>,
    page: usize,
    interval: Duration,
) -> ProgressTicker {
    let (ticker, rx) = ProgressTicker::start(pool.clone(), page, interval);
    std::thread::Builder::new()
        .name("progress-print".into())
        .spawn(move || {
            for s in rx {
                eprint!(
                    "\r  {} / {}",
                    format_millis(s.position.as_millis() as u64),
                    format_millis(s.duration.as_millis() as u64)
                );
                std::io::stderr().flush().ok();
            }
        })
        .ok();
    ticker
}
