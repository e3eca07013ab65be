//! Interactive command prompt.
//!
//! Reads lines from stdin on a dedicated thread (tokio's stdin would block
//! runtime shutdown) and answers them on its own task, so a slow `adb`
//! command typed here never holds up the reconciliation loop.

use std::sync::Arc;

use colored::Colorize;
use tokio::sync::{mpsc, watch, Notify};

use crate::infrastructure::{AdbDriver, AddressStore, CommandRunner, DebugSwitch};

/// Commands and their help text, in display order.
const HELP: &[(&str, &str)] = &[
    ("help", "List commands"),
    ("debug", "Toggle debug printing"),
    ("adb", "Run adb commands"),
    ("status", "Show connection status"),
    ("quit", "Stop adb-tether"),
];

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Debug,
    Adb(Vec<String>),
    Status,
    Quit,
    Empty,
    Unknown(String),
}

/// Parse one input line. Only the command word is case-insensitive; `adb`
/// arguments are passed through untouched.
pub fn parse_line(line: &str) -> ConsoleCommand {
    let line = line.replace('\r', "");
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return ConsoleCommand::Empty;
    };

    match command.to_lowercase().as_str() {
        "help" | "?" => ConsoleCommand::Help,
        "debug" => ConsoleCommand::Debug,
        "adb" => ConsoleCommand::Adb(words.map(str::to_string).collect()),
        "status" => ConsoleCommand::Status,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => ConsoleCommand::Unknown(other.to_string()),
    }
}

/// Help listing, one command per line.
pub fn help_text() -> String {
    HELP.iter()
        .map(|(command, text)| format!("  {command} - {text}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What the console prints in response to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Error(String),
    Quit,
    Nothing,
}

/// The interactive prompt.
pub struct Console<R, S, D> {
    adb: AdbDriver<R>,
    store: S,
    connected: watch::Receiver<Option<String>>,
    debug: D,
}

impl<R, S, D> Console<R, S, D>
where
    R: CommandRunner,
    S: AddressStore,
    D: DebugSwitch,
{
    pub const fn new(
        adb: AdbDriver<R>,
        store: S,
        connected: watch::Receiver<Option<String>>,
        debug: D,
    ) -> Self {
        Self {
            adb,
            store,
            connected,
            debug,
        }
    }

    /// Answer a single command.
    pub async fn execute(&self, command: ConsoleCommand) -> Reply {
        match command {
            ConsoleCommand::Help => Reply::Text(help_text()),
            ConsoleCommand::Debug => match self.debug.toggle_debug() {
                Ok(true) => Reply::Text("Enabled debug printing".into()),
                Ok(false) => Reply::Text("Disabled debug printing".into()),
                Err(e) => Reply::Error(e.to_string()),
            },
            ConsoleCommand::Adb(args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                match self.adb.passthrough(&args).await {
                    Ok(out) => Reply::Text(out),
                    Err(e) => Reply::Error(e.to_string()),
                }
            }
            ConsoleCommand::Status => Reply::Text(self.status()),
            ConsoleCommand::Quit => Reply::Quit,
            ConsoleCommand::Empty => Reply::Nothing,
            ConsoleCommand::Unknown(word) => {
                Reply::Error(format!("Unknown command '{word}', type 'help' for a list"))
            }
        }
    }

    fn status(&self) -> String {
        let connected = self
            .connected
            .borrow()
            .clone()
            .unwrap_or_else(|| "not connected".into());
        let cached = match self.store.load() {
            Ok(Some(address)) => address,
            Ok(None) => "none".into(),
            Err(e) => format!("unreadable ({e})"),
        };
        format!("  connected: {connected}\n  cached address: {cached}")
    }

    /// Serve commands until `quit` or end of input. `quit` also fires
    /// `shutdown` so the reconciliation loop stops.
    pub async fn run(self, shutdown: Arc<Notify>) {
        let mut lines = spawn_stdin_reader();

        while let Some(line) = lines.recv().await {
            match self.execute(parse_line(&line)).await {
                Reply::Text(text) => println!("{text}"),
                Reply::Error(message) => eprintln!("{}", message.red()),
                Reply::Nothing => {}
                Reply::Quit => {
                    shutdown.notify_one();
                    return;
                }
            }
        }

        tracing::debug!("Console input closed");
    }
}

/// Forward stdin lines over a channel from a plain OS thread.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::domain::Result;
    use crate::infrastructure::runner::scripted::ScriptedRunner;

    struct FakeSwitch(AtomicBool);

    impl DebugSwitch for FakeSwitch {
        fn toggle_debug(&self) -> Result<bool> {
            let now = !self.0.load(Ordering::Relaxed);
            self.0.store(now, Ordering::Relaxed);
            Ok(now)
        }
    }

    struct FixedStore(Option<&'static str>);

    impl AddressStore for FixedStore {
        fn load(&self) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }

        fn save(&self, _address: &str) -> Result<()> {
            Ok(())
        }
    }

    fn console(
        responses: Vec<std::result::Result<&str, &str>>,
        connected: Option<&str>,
    ) -> Console<ScriptedRunner, FixedStore, FakeSwitch> {
        let adb = AdbDriver::new(ScriptedRunner::with_responses(responses), 5555, "wlan0");
        let (_tx, rx) = watch::channel(connected.map(str::to_string));
        Console::new(adb, FixedStore(Some("10.0.0.5")), rx, FakeSwitch(AtomicBool::new(false)))
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("HELP"), ConsoleCommand::Help);
        assert_eq!(parse_line("  \r"), ConsoleCommand::Empty);
        assert_eq!(parse_line("exit"), ConsoleCommand::Quit);
        assert_eq!(
            parse_line("adb -s 1WMHH815 shell getprop\r"),
            ConsoleCommand::Adb(vec![
                "-s".into(),
                "1WMHH815".into(),
                "shell".into(),
                "getprop".into()
            ])
        );
        assert_eq!(parse_line("frob"), ConsoleCommand::Unknown("frob".into()));
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for (command, _) in HELP {
            assert!(help.contains(&format!("  {command} - ")));
        }
    }

    #[tokio::test]
    async fn test_debug_toggles() {
        let console = console(vec![], None);
        assert_eq!(
            console.execute(ConsoleCommand::Debug).await,
            Reply::Text("Enabled debug printing".into())
        );
        assert_eq!(
            console.execute(ConsoleCommand::Debug).await,
            Reply::Text("Disabled debug printing".into())
        );
    }

    #[tokio::test]
    async fn test_adb_passthrough() {
        let console = console(vec![Ok("List of devices attached\n")], None);
        let reply = console
            .execute(ConsoleCommand::Adb(vec!["devices".into()]))
            .await;

        assert_eq!(reply, Reply::Text("List of devices attached\n".into()));
        assert_eq!(console.adb.passthrough(&[]).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_adb_error_is_reported() {
        let console = console(vec![Err("error: no devices/emulators found")], None);
        let reply = console
            .execute(ConsoleCommand::Adb(vec!["shell".into()]))
            .await;

        assert!(matches!(reply, Reply::Error(m) if m.contains("no devices/emulators found")));
    }

    #[tokio::test]
    async fn test_status_shows_indicator_and_cache() {
        let console = console(vec![], Some("10.0.0.5"));
        let Reply::Text(status) = console.execute(ConsoleCommand::Status).await else {
            panic!("status should print text");
        };

        assert!(status.contains("connected: 10.0.0.5"));
        assert!(status.contains("cached address: 10.0.0.5"));
    }
}
