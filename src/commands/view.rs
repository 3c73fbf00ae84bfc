//! Commands that read the session stream.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_sidebar::ancestry::{GitLog, HistorySource, NoHistory};
use agent_sidebar::client::StreamClient;
use agent_sidebar::config::Config;
use agent_sidebar::console::{Console, ViewSink};
use agent_sidebar::display::render_groups;
use agent_sidebar::grouping::best_activatable_entry;
use agent_sidebar::terminal::{ExecutionResult, TmuxControl};
use agent_sidebar::{Session, SessionGroup};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::info;

/// ANSI clear screen and home cursor.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// How often `watch` redraws so relative ages stay current.
const REDRAW_INTERVAL: Duration = Duration::from_secs(30);

type BoxedHistory = Box<dyn HistorySource + Send>;

fn history_source(config: &Config) -> BoxedHistory {
    if config.git.enabled {
        Box::new(GitLog::with_program(config.git.program.clone()))
    } else {
        Box::new(NoHistory)
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().expect("failed to create tokio runtime")
}

/// Latest grouped view, shared by the apply thread and the redraw tick.
#[derive(Default)]
struct WatchScreen {
    groups: Mutex<Option<Vec<SessionGroup>>>,
}

impl WatchScreen {
    /// Full screen body for `now`, or `None` before the first view.
    fn frame(&self, now: DateTime<Utc>) -> Option<String> {
        let groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        groups.as_deref().map(|groups| render_screen(groups, now))
    }

    fn replace(&self, groups: &[SessionGroup]) {
        *self.groups.lock().unwrap_or_else(|e| e.into_inner()) = Some(groups.to_vec());
        self.draw();
    }

    fn draw(&self) {
        if let Some(body) = self.frame(Utc::now()) {
            let mut out = std::io::stdout().lock();
            let _ = write!(out, "{}{}", CLEAR_SCREEN, body);
            let _ = out.flush();
        }
    }
}

fn render_screen(groups: &[SessionGroup], now: DateTime<Utc>) -> String {
    if groups.is_empty() {
        "No sessions\n".to_string()
    } else {
        render_groups(groups, now)
    }
}

/// Redraws the whole view on every change.
struct WatchSink {
    socket: PathBuf,
    screen: Arc<WatchScreen>,
}

impl ViewSink for WatchSink {
    fn groups_changed(&mut self, groups: &[SessionGroup]) {
        self.screen.replace(groups);
    }

    fn connectivity_changed(&mut self, connected: bool) {
        if connected {
            eprintln!("Connected to {}", self.socket.display());
        } else {
            eprintln!("Disconnected from {}, retrying", self.socket.display());
        }
    }
}

/// Keeps the first view and stops the client.
struct FirstViewSink {
    stop: agent_sidebar::client::StopHandle,
    groups: Option<Vec<SessionGroup>>,
}

impl ViewSink for FirstViewSink {
    fn groups_changed(&mut self, groups: &[SessionGroup]) {
        if self.groups.is_none() {
            self.groups = Some(groups.to_vec());
            self.stop.stop();
        }
    }

    fn connectivity_changed(&mut self, _connected: bool) {}
}

/// Streams the grouped view until Ctrl-C.
pub(crate) fn run_watch(config: &Config, socket: PathBuf, retry: Duration) -> ExitCode {
    let history = history_source(config);

    runtime().block_on(async move {
        let (client, stop) = StreamClient::new(socket.clone(), retry);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client_task = client.spawn(tx);

        let screen = Arc::new(WatchScreen::default());
        let sink_screen = Arc::clone(&screen);
        let apply = tokio::task::spawn_blocking(move || {
            let mut console = Console::new(history);
            let mut sink = WatchSink {
                socket,
                screen: sink_screen,
            };
            console.run_blocking(&mut rx, &mut sink);
        });

        let redraw = tokio::spawn(async move {
            let mut tick = tokio::time::interval(REDRAW_INTERVAL);
            tick.tick().await;
            loop {
                tick.tick().await;
                screen.draw();
            }
        });

        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Error: failed to listen for Ctrl-C: {}", e);
        }
        info!("Interrupted, shutting down");
        stop.stop();
        redraw.abort();

        let _ = client_task.await;
        let _ = apply.await;
    });

    ExitCode::SUCCESS
}

/// Waits for the first applied operation and returns the grouped view,
/// or `None` if nothing arrived within `timeout`.
fn first_view(
    config: &Config,
    socket: PathBuf,
    retry: Duration,
    timeout: Duration,
) -> Option<Vec<SessionGroup>> {
    let history = history_source(config);

    runtime().block_on(async move {
        let (client, stop) = StreamClient::new(socket, retry);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client_task = client.spawn(tx);

        let sink_stop = stop.clone();
        let apply = tokio::task::spawn_blocking(move || {
            let mut console = Console::new(history);
            let mut sink = FirstViewSink {
                stop: sink_stop,
                groups: None,
            };
            console.run_blocking(&mut rx, &mut sink);
            sink.groups
        });

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            stop.stop();
        });

        let _ = client_task.await;
        timer.abort();
        apply.await.ok().flatten()
    })
}

fn report_no_data(socket: &std::path::Path, timeout: Duration) -> ExitCode {
    eprintln!(
        "Error: no data from {} within {}",
        socket.display(),
        humantime::format_duration(timeout)
    );
    ExitCode::FAILURE
}

/// Prints the grouped view once.
pub(crate) fn run_list(config: &Config, socket: PathBuf, retry: Duration, timeout: Duration) -> ExitCode {
    let Some(groups) = first_view(config, socket.clone(), retry, timeout) else {
        return report_no_data(&socket, timeout);
    };

    if groups.is_empty() {
        println!("No sessions");
    } else {
        print!("{}", render_groups(&groups, Utc::now()));
    }
    ExitCode::SUCCESS
}

/// Switches tmux to the session most worth looking at.
pub(crate) fn run_focus(config: &Config, socket: PathBuf, retry: Duration, timeout: Duration) -> ExitCode {
    let Some(groups) = first_view(config, socket.clone(), retry, timeout) else {
        return report_no_data(&socket, timeout);
    };

    let Some(entry) = best_activatable_entry(&groups) else {
        eprintln!("No session with a tmux pane to focus");
        return ExitCode::FAILURE;
    };

    let control = TmuxControl::new(config.tmux.program.clone());
    match control.activate(&entry.session) {
        Ok(ExecutionResult::Executed) => {
            println!("Switched to {}", entry.session.display_label);
            ExitCode::SUCCESS
        }
        Ok(ExecutionResult::DisplayCommand(cmd)) => {
            println!("Not inside tmux. Run manually:");
            println!("  {}", cmd);
            ExitCode::SUCCESS
        }
        Ok(ExecutionResult::Failed(msg)) => {
            eprintln!("Error: {}", msg);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn find_session<'a>(groups: &'a [SessionGroup], id: &str) -> Option<&'a Session> {
    groups
        .iter()
        .flat_map(|group| group.entries.iter())
        .map(|entry| &entry.session)
        .find(|session| session.id == id)
}

/// Hands `source_id`'s branch to `target_id` for merging.
pub(crate) fn run_merge(
    config: &Config,
    socket: PathBuf,
    retry: Duration,
    timeout: Duration,
    source_id: &str,
    target_id: &str,
) -> ExitCode {
    let Some(groups) = first_view(config, socket.clone(), retry, timeout) else {
        return report_no_data(&socket, timeout);
    };

    let (Some(source), Some(target)) = (find_session(&groups, source_id), find_session(&groups, target_id)) else {
        let missing = if find_session(&groups, source_id).is_none() {
            source_id
        } else {
            target_id
        };
        eprintln!("Error: no session with id {}", missing);
        return ExitCode::FAILURE;
    };

    let control = TmuxControl::new(config.tmux.program.clone());
    let git = GitLog::with_program(config.git.program.clone());
    match control.merge(source, target, &git, &config.tmux.agent) {
        Ok(handoff) => {
            println!(
                "Merging {} in tmux session {} (pane {})",
                handoff.branch, handoff.tmux_session, handoff.pane
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
