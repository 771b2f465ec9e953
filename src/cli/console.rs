//! Line-oriented simulator console.
//!
//! Each line is one command: a device signal, a wizard action, an export
//! action, or a console command. Used interactively over stdin and for
//! replaying scripts deterministically on a manual clock.

use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::adapters::{self, SimulatorAction};
use crate::config::AppConfig;
use crate::core::dispatcher::{ManualClock, SystemClock};
use crate::core::models::SessionSnapshot;
use crate::core::{DeviceSignal, Event, NotificationLog, Passphrase, Session};
use crate::error::Error;

const HELP: &str = "\
device:  insert-locked | insert-unlocked | remove | lock | unlock-ok | unlock-fail
wizard:  next | back | restart | unlock <passphrase>
export:  export | export-ok | export-fail
console: status | wait <ms> | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(Event),
    Status,
    /// Advance the manual clock. Only meaningful when replaying.
    Wait(Duration),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let unknown = || Error::UnknownCommand(line.to_string());

        let command = match word {
            "insert-locked" | "found-locked" => Command::Event(Event::Device(DeviceSignal::FoundLocked)),
            "insert-unlocked" | "found-unlocked" => {
                Command::Event(Event::Device(DeviceSignal::FoundUnlocked))
            }
            "remove" | "not-found" => Command::Event(Event::Device(DeviceSignal::NotFound)),
            "lock" | "relock" => Command::Event(Event::Device(DeviceSignal::Relock)),
            "unlock-ok" => Command::Event(Event::Device(DeviceSignal::UnlockSucceeded)),
            "unlock-fail" => Command::Event(Event::Device(DeviceSignal::UnlockFailed)),
            "unlock" => Command::Event(Event::AttemptUnlock(Passphrase::new(rest))),
            "next" => Command::Event(Event::Advance),
            "back" => Command::Event(Event::Retreat),
            "restart" => Command::Event(Event::Restart),
            "export" => Command::Event(Event::StartExport),
            "export-ok" => Command::Event(Event::ExportSucceeded),
            "export-fail" => Command::Event(Event::ExportFailed),
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "wait" => {
                let ms = rest.parse::<u64>().map_err(|_| unknown())?;
                Command::Wait(Duration::from_millis(ms))
            }
            _ => return Err(unknown()),
        };

        // Only `unlock` and `wait` take an argument.
        if !rest.is_empty() && !matches!(word, "unlock" | "wait") {
            return Err(unknown());
        }

        Ok(command)
    }
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> crate::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    line.parse().map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<W: Write> {
    session: Session,
    log: NotificationLog,
    out: W,
    json: bool,
    clock: Option<ManualClock>,
}

impl<W: Write> Console<W> {
    /// `clock` is the manual clock driving `session`, if any; `wait` needs it.
    pub fn new(mut session: Session, out: W, json: bool, clock: Option<ManualClock>) -> Self {
        let log = NotificationLog::new();
        session.subscribe(log.clone());
        Self {
            session,
            log,
            out,
            json,
            clock,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn start(&mut self) -> Result<()> {
        self.session.start();
        self.flush_notifications()
    }

    pub fn pump(&mut self) -> Result<()> {
        self.session.pump();
        self.flush_notifications()
    }

    /// Parse and run a line. Unknown commands are reported, not fatal.
    pub fn execute_line(&mut self, line: &str) -> Result<Flow> {
        match parse_line(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => Ok(Flow::Continue),
            Err(err) => {
                self.report_error(&err)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Event(event) => {
                if let Err(err) = self.session.handle(event) {
                    self.flush_notifications()?;
                    self.report_error(&err)?;
                }
            }
            Command::Status => self.print_status()?,
            Command::Wait(duration) => match &self.clock {
                Some(clock) => {
                    clock.advance(duration);
                    self.session.pump();
                }
                None => writeln!(self.out, "wait is only available when replaying a script")?,
            },
            Command::Help => self.print_help()?,
            Command::Quit => return Ok(Flow::Quit),
        }

        self.flush_notifications()?;
        Ok(Flow::Continue)
    }

    fn flush_notifications(&mut self) -> Result<()> {
        for note in self.log.take() {
            if self.json {
                let line = serde_json::to_string(&note).context("Failed to encode notification")?;
                writeln!(self.out, "{}", line)?;
            } else {
                writeln!(self.out, "> {}", note)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn report_error(&mut self, err: &Error) -> Result<()> {
        if self.json {
            let line = serde_json::json!({ "error": err.to_string() });
            writeln!(self.out, "{}", line)?;
        } else {
            writeln!(self.out, "error: {}", err)?;
        }
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        let snapshot = self.session.snapshot();
        if self.json {
            let line = serde_json::to_string(&snapshot).context("Failed to encode status")?;
            writeln!(self.out, "{}", line)?;
        } else {
            write_status(&mut self.out, &snapshot)?;
        }
        Ok(())
    }

    fn print_help(&mut self) -> Result<()> {
        writeln!(self.out, "{}", HELP)?;
        let actions = SimulatorAction::available(self.session.device_state());
        if !actions.is_empty() {
            let labels: Vec<&str> = actions.iter().map(|action| action.label()).collect();
            writeln!(self.out, "simulator can: {}", labels.join(", "))?;
        }
        Ok(())
    }
}

fn write_status(out: &mut impl Write, snapshot: &SessionSnapshot) -> std::io::Result<()> {
    let current = snapshot.current_step;
    writeln!(out, "step:   {} ({})", current, current.title())?;
    writeln!(out, "device: {}", snapshot.device)?;
    match snapshot.export.id {
        Some(id) => writeln!(out, "export: {} [{}]", snapshot.export.status, id)?,
        None => writeln!(out, "export: {}", snapshot.export.status)?,
    }
    for view in &snapshot.steps {
        let mark = if view.satisfied { "x" } else { " " };
        let pointer = if view.current { ">" } else { " " };
        writeln!(out, " {} [{}] {}", pointer, mark, view.title)?;
    }
    if snapshot.unlock_failed {
        writeln!(out, "last unlock attempt failed")?;
    }
    Ok(())
}

/// Run a script on a manual clock. Time only passes on `wait`.
pub fn replay<W: Write>(script: &str, config: &AppConfig, json: bool, out: W) -> Result<W> {
    let clock = ManualClock::new();
    let session = adapters::simulated_session(config, Box::new(clock.clone()));
    let mut console = Console::new(session, out, json, Some(clock));

    console.start()?;
    for line in script.lines() {
        if console.execute_line(line)? == Flow::Quit {
            break;
        }
    }

    Ok(console.into_output())
}

/// Interactive console over stdin, with timers running on the system clock.
pub async fn run_interactive(config: &AppConfig, json: bool) -> Result<()> {
    let session = adapters::simulated_session(config, Box::new(SystemClock::new()));
    let mut console = Console::new(session, std::io::stdout(), json, None);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    if !json {
        println!("(Simulator) Type 'help' for commands.");
    }
    console.start()?;

    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            line = rx.recv() => {
                let Some(line) = line else { break };
                if console.execute_line(&line)? == Flow::Quit {
                    break;
                }
            }
            _ = ticker.tick() => console.pump()?,
        }
    }

    Ok(())
}
