//! Snackbar queue: background outcomes → transient user-visible banners.
//!
//! Producers hold cloned [`SnackbarSender`]s. Exactly one [`SnackbarHost`],
//! owned by the active screen, drains events into a [`Presenter`]. The host
//! dismisses whatever banner is showing before presenting the next one.

use std::fmt;
use std::sync::mpsc;

use tracing::debug;

pub struct SnackbarAction {
    pub label: String,
    on_click: Box<dyn FnOnce() + Send>,
}

impl SnackbarAction {
    pub fn new(label: impl Into<String>, on_click: impl FnOnce() + Send + 'static) -> Self {
        SnackbarAction {
            label: label.into(),
            on_click: Box::new(on_click),
        }
    }
}

impl fmt::Debug for SnackbarAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnackbarAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct SnackbarEvent {
    pub message: String,
    pub action: Option<SnackbarAction>,
}

impl SnackbarEvent {
    pub fn new(message: impl Into<String>) -> Self {
        SnackbarEvent {
            message: message.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: SnackbarAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnackbarResult {
    Dismissed,
    ActionPerformed,
}

/// Where banners are shown.
pub trait Presenter {
    fn dismiss_current(&mut self);
    fn show(&mut self, message: &str, action_label: Option<&str>) -> SnackbarResult;
}

#[derive(Clone)]
pub struct SnackbarSender(mpsc::Sender<SnackbarEvent>);

impl SnackbarSender {
    /// Enqueue an event. Returns false if the host is gone.
    pub fn send(&self, event: SnackbarEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

pub struct SnackbarHost {
    rx: mpsc::Receiver<SnackbarEvent>,
}

pub fn channel() -> (SnackbarSender, SnackbarHost) {
    let (tx, rx) = mpsc::channel();
    (SnackbarSender(tx), SnackbarHost { rx })
}

impl SnackbarHost {
    /// Present everything queued right now; returns how many were shown.
    pub fn pump(&self, presenter: &mut dyn Presenter) -> usize {
        let mut n = 0;
        while let Ok(event) = self.rx.try_recv() {
            present(presenter, event);
            n += 1;
        }
        n
    }

    /// Present events until every sender is dropped.
    pub fn run(self, presenter: &mut dyn Presenter) {
        for event in self.rx.iter() {
            present(presenter, event);
        }
    }

    /// Tear down: discard pending events, returning how many were dropped.
    pub fn shutdown(self) -> usize {
        let dropped = self.rx.try_iter().count();
        if dropped > 0 {
            debug!("snackbar: discarded {} pending events", dropped);
        }
        dropped
    }
}

fn present(presenter: &mut dyn Presenter, event: SnackbarEvent) {
    presenter.dismiss_current();
    let label = event.action.as_ref().map(|a| a.label.as_str());
    let result = presenter.show(&event.message, label);
    if result == SnackbarResult::ActionPerformed {
        if let Some(action) = event.action {
            (action.on_click)();
        }
    }
}

/// Prints banners to the terminal. With `perform_actions` set, any offered
/// action is taken as if clicked.
pub struct ConsolePresenter {
    pub perform_actions: bool,
}

impl Presenter for ConsolePresenter {
    fn dismiss_current(&mut self) {}

    fn show(&mut self, message: &str, action_label: Option<&str>) -> SnackbarResult {
        match action_label {
            Some(label) if self.perform_actions => {
                println!("{} ({})", message, label.to_lowercase());
                SnackbarResult::ActionPerformed
            }
            Some(label) => {
                println!("{} [{}]", message, label);
                SnackbarResult::Dismissed
            }
            None => {
                println!("{}", message);
                SnackbarResult::Dismissed
            }
        }
    }
}
