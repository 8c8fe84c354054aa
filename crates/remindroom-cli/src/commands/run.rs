//! Foreground runner.
//!
//! Drives a board on the wall clock from a single-threaded tokio runtime:
//! sleep until the next timer or a line on stdin, then pump. Every event is
//! printed to stdout as one JSON line.
//!
//! Interactive commands (`n` is the reminder's position in the listing):
//!
//! ```text
//! a <n>   acknowledge
//! m <n>   minimize the open notification
//! t <n>   toggle activation
//! q       quit
//! ```

use std::collections::HashMap;
use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

use remindroom_core::notify::{
    ClosedNotification, NotificationHandle, NotificationPayload, NotificationService, Outcome,
};
use remindroom_core::{
    Board, Config, NotificationCenter, NotificationError, ReminderId, SqliteStore, WallClock,
};

use super::resolve;

/// How long to sleep when no timer is armed.
const IDLE_POLL_MS: u64 = 1_000;

type LiveBoard = Board<WallClock, TerminalNotifier, SqliteStore>;

#[derive(Args)]
pub struct RunArgs {
    /// Reminders to run (id, id prefix or name); all stored ones if empty
    reminders: Vec<String>,
    /// Stop after this many seconds
    #[arg(long = "for", value_name = "SECS")]
    duration_secs: Option<u64>,
}

/// Notification center that also shows notifications on the terminal.
pub struct TerminalNotifier {
    center: NotificationCenter,
    labels: HashMap<ReminderId, (usize, String)>,
}

impl TerminalNotifier {
    fn new(center: NotificationCenter) -> Self {
        Self {
            center,
            labels: HashMap::new(),
        }
    }

    fn label(&self, reminder: ReminderId) -> String {
        match self.labels.get(&reminder) {
            Some((n, name)) => format!("#{n} {name}"),
            None => reminder.to_string(),
        }
    }
}

impl NotificationService for TerminalNotifier {
    fn is_suppressed(&self) -> bool {
        self.center.is_suppressed()
    }

    fn present(
        &mut self,
        payload: NotificationPayload,
    ) -> Result<NotificationHandle, NotificationError> {
        let label = self.label(payload.reminder);
        let n = self.labels.get(&payload.reminder).map_or(0, |(n, _)| *n);
        let message = payload.message.clone();
        let handle = self.center.present(payload)?;
        eprintln!("┌ {label}: {message}");
        eprintln!("└ a {n} to acknowledge, m {n} to minimize");
        Ok(handle)
    }

    fn close(&mut self, handle: NotificationHandle, outcome: Outcome) {
        self.center.close(handle, outcome);
    }

    fn is_open(&self, handle: NotificationHandle) -> bool {
        self.center.is_open(handle)
    }

    fn close_all(&mut self) {
        self.center.close_all();
    }

    fn sound(&mut self, message: &str, reminder: ReminderId) -> Result<(), NotificationError> {
        eprint!("\x07");
        self.center.sound(message, reminder)
    }

    fn take_outcomes(&mut self) -> Vec<ClosedNotification> {
        self.center.take_outcomes()
    }
}

enum Command {
    Acknowledge(usize),
    Minimize(usize),
    Toggle(usize),
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or("empty command")?;
    if verb == "q" {
        return Ok(Command::Quit);
    }
    let n = parts
        .next()
        .ok_or_else(|| format!("'{verb}' needs a reminder number"))?
        .parse::<usize>()
        .map_err(|e| format!("bad reminder number: {e}"))?;
    match verb {
        "a" => Ok(Command::Acknowledge(n)),
        "m" => Ok(Command::Minimize(n)),
        "t" => Ok(Command::Toggle(n)),
        other => Err(format!("unknown command '{other}' (a, m, t, q)")),
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    let configs = store.load_all()?;

    let selected = if args.reminders.is_empty() {
        configs.clone()
    } else {
        args.reminders
            .iter()
            .map(|q| resolve(&configs, q).cloned())
            .collect::<Result<Vec<_>, _>>()?
    };
    if selected.is_empty() {
        return Err("no reminders to run; create one first".into());
    }

    let mut center = NotificationCenter::new();
    center.set_suppressed(config.notifications.suppressed);
    let mut notifier = TerminalNotifier::new(center);
    for (i, c) in selected.iter().enumerate() {
        notifier.labels.insert(c.id, (i + 1, c.name.clone()));
    }

    let mut board = Board::new(WallClock::new(), notifier, store)
        .with_tick_interval(config.engine.tick_interval_ms);
    let ids: Vec<_> = selected.into_iter().map(|c| board.restore(c)).collect();
    for id in &ids {
        board.activate(*id)?;
        if let Some(r) = board.get(*id) {
            eprintln!("{} runs {}", board.notifier().label(*id), r.describe_repeat());
        }
    }
    board.emit_snapshots();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let deadline = args
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let outcome = runtime.block_on(event_loop(&mut board, &ids, deadline));
    // A pending stdin read would otherwise hold up shutdown.
    runtime.shutdown_background();
    outcome?;

    for id in &ids {
        board.deactivate(*id)?;
    }
    print_events(&mut board)?;
    Ok(())
}

async fn event_loop(
    board: &mut LiveBoard,
    ids: &[ReminderId],
    deadline: Option<Instant>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        print_events(board)?;

        let now = board.now_ms();
        let wait_ms = board
            .next_deadline()
            .map_or(IDLE_POLL_MS, |due| due.saturating_sub(now));
        let mut wake_at = Instant::now() + Duration::from_millis(wait_ms);
        if let Some(deadline) = deadline {
            if deadline <= Instant::now() {
                return Ok(());
            }
            wake_at = wake_at.min(deadline);
        }

        tokio::select! {
            _ = tokio::time::sleep_until(wake_at) => {
                let now = board.now_ms();
                board.pump(now);
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed; running until the deadline");
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Quit) => return Ok(()),
                    Ok(command) => {
                        if let Err(e) = apply(board, ids, command) {
                            eprintln!("error: {e}");
                        }
                    }
                    Err(e) => eprintln!("error: {e}"),
                }
            }
        }
    }
}

fn apply(
    board: &mut LiveBoard,
    ids: &[ReminderId],
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let pick = |n: usize| {
        n.checked_sub(1)
            .and_then(|i| ids.get(i).copied())
            .ok_or_else(|| format!("no reminder #{n}"))
    };
    match command {
        Command::Acknowledge(n) => board.acknowledge(pick(n)?)?,
        Command::Minimize(n) => {
            if !board.minimize(pick(n)?)? {
                eprintln!("#{n} has no open notification");
            }
        }
        Command::Toggle(n) => board.toggle(pick(n)?)?,
        Command::Quit => {}
    }
    Ok(())
}

fn print_events(board: &mut LiveBoard) -> Result<(), serde_json::Error> {
    for event in board.drain_events() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
