use std::io::Write;

use clap::Subcommand;
use eyerest_core::{
    format_clock, AlertKind, Config, Database, Event, Intent, Phase, SettingField, Snapshot,
    TimerService,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::open_controller;

const HELP: &str = "\
commands:
  s            start / pause
  w | r        switch to work / relax
  m            toggle manual / automate
  x            reset (work phase, counters to zero)
  o | c        open / close settings
  set <name> <value>   name: work, relax, distance, alert
  ?            this help
  q            quit";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run an interactive timer session
    Run {
        /// Never play the sound cue
        #[arg(long)]
        mute: bool,
    },
    /// Print current timer state as JSON
    Status,
    /// Reset to the work phase and zero the session counters
    Reset,
    /// Show the phase-transition mode, or flip it
    Mode {
        /// Switch between manual and automate
        #[arg(long)]
        toggle: bool,
    },
}

pub fn run(action: TimerAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run { mute } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_session(config, mute))?;
        }
        TimerAction::Status => {
            let ctl = open_controller(config, true)?;
            println!("{}", serde_json::to_string_pretty(&ctl.snapshot())?);
        }
        TimerAction::Reset => {
            let mut ctl = open_controller(config, true)?;
            let event = ctl.reset();
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Mode { toggle } => {
            let mut ctl = open_controller(config, true)?;
            if toggle {
                ctl.toggle_mode();
            }
            println!("{}", ctl.mode());
        }
    }
    Ok(())
}

/// A line typed during an interactive session.
#[derive(Debug, PartialEq, Eq)]
enum SessionCommand {
    Intent(Intent),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<SessionCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".into());
    };
    let intent = match head {
        "s" | "start" | "pause" => Intent::ToggleRunning,
        "w" | "work" => Intent::SelectPhase(Phase::Work),
        "r" | "relax" => Intent::SelectPhase(Phase::Relax),
        "m" | "mode" => Intent::ToggleMode,
        "x" | "reset" => Intent::Reset,
        "o" | "open" => Intent::OpenSettings,
        "c" | "close" => Intent::CloseSettings,
        "set" => {
            let name = words.next().ok_or("usage: set <name> <value>")?;
            let field = name.parse::<SettingField>().map_err(|e| e.to_string())?;
            let raw = words.collect::<Vec<_>>().join(" ");
            Intent::UpdateSetting { field, raw }
        }
        "?" | "h" | "help" => return Ok(SessionCommand::Help),
        "q" | "quit" | "exit" => return Ok(SessionCommand::Quit),
        other => return Err(format!("unknown command '{other}' (? for help)")),
    };
    Ok(SessionCommand::Intent(intent))
}

fn status_line(snap: &Snapshot) -> String {
    let state = if snap.is_running {
        "running"
    } else if snap.auto_start_pending {
        "starting"
    } else {
        "paused"
    };
    format!(
        "[{}] {} {} ({}) | work {} relax {} | {}",
        snap.phase, snap.remaining, state, snap.mode, snap.counters.work_completed,
        snap.counters.relax_completed, snap.message
    )
}

fn settings_panel(snap: &Snapshot) -> String {
    let s = &snap.settings;
    format!(
        "settings:\n  work      {} min\n  relax     {} s\n  distance  {} ft\n  alert     {}",
        s.work_minutes, s.relax_seconds, s.distance_feet, s.alert_kind
    )
}

fn render(snap: &Snapshot) {
    print!("\r\x1b[2K{}", status_line(snap));
    let _ = std::io::stdout().flush();
}

async fn run_session(config: &Config, mute: bool) -> Result<(), Box<dyn std::error::Error>> {
    let history = Database::open()?;
    let service = TimerService::spawn(open_controller(config, mute)?, config.timing());
    let mut events = service.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = tokio::time::interval(config.timing().tick);

    println!("{HELP}");
    loop {
        tokio::select! {
            _ = redraw.tick() => render(&service.snapshot().await),
            event = events.recv() => {
                let Ok(event) = event else { continue };
                if let Event::PhaseCompleted { phase, next, duration_secs, at, .. } = &event {
                    if let Err(e) = history.record_completion(*phase, *duration_secs, *at) {
                        warn!(error = %e, "failed to record completion");
                    }
                    let snap = service.snapshot().await;
                    let banner = format!(
                        "*** {phase} finished after {} ***  {}",
                        format_clock(*duration_secs),
                        if *next == Phase::Relax { snap.message.as_str() } else { "Back to work." }
                    );
                    // Visual alerts rely on the view: show the banner inverted.
                    if snap.settings.alert_kind == AlertKind::Visual {
                        println!("\r\x1b[2K\x1b[7m{banner}\x1b[0m");
                    } else {
                        println!("\r\x1b[2K{banner}");
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(SessionCommand::Quit) => break,
                    Ok(SessionCommand::Help) => println!("{HELP}"),
                    Ok(SessionCommand::Intent(intent)) => {
                        service.dispatch(intent).await;
                        let snap = service.snapshot().await;
                        if snap.settings_open {
                            println!("{}", settings_panel(&snap));
                        }
                        render(&snap);
                    }
                    Err(message) => println!("{message}"),
                }
            }
        }
    }
    println!();
    service.shutdown().await;
    Ok(())
}
