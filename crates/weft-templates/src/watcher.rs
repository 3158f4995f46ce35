//! Background reload of written template files.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::WatchError;
use crate::store::{TemplateStore, is_hidden};

/// Message consumed by the watcher thread.
#[derive(Debug)]
enum Message {
    Event(notify::Result<Event>),
    Shutdown,
}

/// Handle to a running template directory watch.
///
/// Dropping the handle (or calling [`stop`](Self::stop)) releases the
/// filesystem subscription and joins the watcher thread.
pub struct TemplateWatcher {
    tx: mpsc::Sender<Message>,
    watcher: Option<RecommendedWatcher>,
    thread: Option<JoinHandle<()>>,
}

impl TemplateWatcher {
    pub(crate) fn start(store: Arc<TemplateStore>) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel();

        let event_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the handle is shutting down.
            let _ = event_tx.send(Message::Event(res));
        })?;
        watcher.watch(store.directory(), RecursiveMode::NonRecursive)?;

        let directory = store.directory().to_path_buf();
        let thread = thread::Builder::new()
            .name("template-watcher".to_owned())
            .spawn(move || run(&store, &rx))?;

        tracing::info!(directory = %directory.display(), "Watching templates for changes");

        Ok(Self {
            tx,
            watcher: Some(watcher),
            thread: Some(thread),
        })
    }

    /// Stop watching and wait for the watcher thread to exit.
    pub fn stop(self) {
        drop(self);
    }

    fn shutdown(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
        self.watcher.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!("Template watcher thread panicked");
        }
    }
}

impl Drop for TemplateWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TemplateWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateWatcher")
            .field("running", &self.thread.is_some())
            .finish_non_exhaustive()
    }
}

/// Process messages one at a time until shutdown.
fn run(store: &TemplateStore, rx: &mpsc::Receiver<Message>) {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Event(Ok(event)) => handle_event(store, &event),
            Message::Event(Err(e)) => {
                tracing::warn!(error = %e, "Template watcher error");
            }
            Message::Shutdown => break,
        }
    }
    tracing::debug!("Template watcher stopped");
}

fn handle_event(store: &TemplateStore, event: &Event) {
    if !is_write(event.kind) {
        return;
    }
    for path in &event.paths {
        if is_hidden(path) {
            continue;
        }
        reload(store, path);
    }
}

fn reload(store: &TemplateStore, path: &Path) {
    match store.reload_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "Reloaded template"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to reload template"),
    }
}

/// Whether an event reports file content being written.
fn is_write(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
    )
}
