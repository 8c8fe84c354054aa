use clap::Args;
use remindroom_core::{
    Board, Channel, Config, ManualClock, NotificationCenter, ReminderConfig, ReminderPatch,
    SqliteStore,
};

use super::resolve;

type OfflineBoard = Board<ManualClock, NotificationCenter, SqliteStore>;

#[derive(Args)]
pub struct CreateArgs {
    /// Display name
    #[arg(long)]
    name: Option<String>,
    /// Text delivered by every channel
    #[arg(long)]
    message: Option<String>,
    /// Seconds between notifications
    #[arg(long)]
    every: Option<u64>,
    /// Hold the next cycle until the notification is acknowledged
    #[arg(long)]
    wait: bool,
    /// Never acknowledge automatically
    #[arg(long)]
    no_auto_ack: bool,
    /// Seconds before an automatic acknowledgement
    #[arg(long)]
    auto_ack_delay: Option<u64>,
    /// Channels to turn off (console, visual, audio)
    #[arg(long, value_delimiter = ',')]
    mute: Vec<String>,
}

impl CreateArgs {
    fn patch(&self) -> Result<ReminderPatch, String> {
        let mut patch = ReminderPatch {
            name: self.name.clone(),
            message: self.message.clone(),
            cycle_duration_secs: self.every,
            wait_for_acknowledgement: self.wait.then_some(true),
            auto_acknowledge: self.no_auto_ack.then_some(false),
            auto_acknowledge_delay_secs: self.auto_ack_delay,
            ..Default::default()
        };
        for name in &self.mute {
            match Channel::parse(name) {
                Some(Channel::Console) => patch.console = Some(false),
                Some(Channel::Visual) => patch.visual = Some(false),
                Some(Channel::Audio) => patch.audio = Some(false),
                None => return Err(format!("unknown channel: {name}")),
            }
        }
        Ok(patch)
    }
}

fn open_board() -> Result<(OfflineBoard, Vec<ReminderConfig>), Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    let configs = store.load_all()?;
    let board = Board::new(ManualClock::new(), NotificationCenter::new(), store);
    Ok((board, configs))
}

pub fn create(args: CreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let patch = args.patch()?;
    let (mut board, _) = open_board()?;

    let id = board.create(&config.defaults);
    if patch != ReminderPatch::default() {
        board.update(id, patch)?;
    }
    board.register(id)?;
    println!("{id}");
    Ok(())
}

pub fn list(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (_, configs) = open_board()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&configs)?);
        return Ok(());
    }

    if configs.is_empty() {
        eprintln!("no reminders");
    }
    for (n, c) in configs.iter().enumerate() {
        let channels: Vec<_> = c.channels.enabled().iter().map(|ch| ch.as_str()).collect();
        let id = c.id.to_string();
        println!(
            "{:>2}  {}  {:<16} {:<18} [{}]{}",
            n + 1,
            &id[..8],
            c.name,
            c.describe_repeat(),
            channels.join(","),
            if c.wait_for_acknowledgement {
                " waits"
            } else {
                ""
            }
        );
    }
    Ok(())
}

pub fn show(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_, configs) = open_board()?;
    let config = resolve(&configs, query)?;
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

pub fn set(query: &str, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let patch = ReminderPatch::from_key_value(key, value)?;
    let (mut board, configs) = open_board()?;
    let id = board.restore(resolve(&configs, query)?.clone());
    board.update(id, patch)?;
    println!("ok");
    Ok(())
}

pub fn remove(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut board, configs) = open_board()?;
    let id = board.restore(resolve(&configs, query)?.clone());
    board.remove(id)?;
    println!("removed {id}");
    Ok(())
}
