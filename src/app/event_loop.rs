use std::io::BufRead;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::app::App;
use crate::host::{FsHost, Host};
use crate::session::Session;

impl App {
    /// Extract the region and keep it in sync until the mirror is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot start, the file cannot be
    /// opened, or the initial extraction fails.
    pub fn run(&mut self) -> Result<()> {
        let mut host = FsHost::new(self.watch_debounce).context("Failed to start file watcher")?;
        if let Some(path) = &self.mirror_path {
            host = host.with_mirror_path(path);
        }
        let source = host
            .open_file(&self.file_path)
            .with_context(|| format!("Failed to open {}", self.file_path.display()))?;

        let mut session = Session::new(host, self.session_config());
        let mirror = session
            .extract_now(source, self.range, 0)
            .with_context(|| format!("Failed to extract {}", self.range))?;
        if let Some(path) = session.host().path_of(mirror) {
            println!("{}", path.display());
        }
        eprintln!("Editing {} in sync. Type q and Enter to stop.", self.range);

        let quit = spawn_quit_listener();
        Self::event_loop(&mut session, self.poll_interval, &quit);
        session.shutdown();
        Ok(())
    }

    fn event_loop<H: Host>(session: &mut Session<H>, poll_interval: Duration, quit: &Receiver<()>) {
        let start = Instant::now();
        loop {
            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            session.pump(now_ms);
            session.tick(now_ms);
            session.pump(now_ms);

            if session.registry().is_empty() && !session.has_pending_requests() {
                info!("mirror closed; stopping");
                break;
            }
            if quit.try_recv().is_ok() {
                info!("quit requested");
                break;
            }

            let sleep = session
                .next_deadline()
                .map_or(poll_interval, |deadline| {
                    Duration::from_millis(deadline.saturating_sub(now_ms)).min(poll_interval)
                });
            thread::sleep(sleep.max(Duration::from_millis(1)));
        }
        debug!(stats = ?session.stats(), "sync loop finished");
    }
}

/// Watch stdin for a `q` line. End of input is not a request to quit.
fn spawn_quit_listener() -> Receiver<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if matches!(line.trim(), "q" | "quit") {
                let _ = tx.send(());
                break;
            }
        }
    });
    rx
}
