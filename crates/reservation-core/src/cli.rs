use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::scheduler::Edge;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "reservation-picker",
    version,
    about = "Date and time-slot picker for reservations",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config file; overrides RESERVATION_PICKER_CONFIG and ./reservation-picker.toml
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the saved picker state
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Pin "today" instead of reading the clock
    #[arg(long = "today", global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print both strips around the current scroll position
    Show {
        #[arg(long, default_value_t = 14)]
        days: usize,
    },
    /// Print the saved state as JSON
    Export,
    /// Forget the saved state
    Reset,
    /// Time availability data
    #[command(subcommand)]
    Slots(SlotsCommand),
    /// Price data
    #[command(subcommand)]
    Price(PriceCommand),
    /// Date selection
    #[command(subcommand)]
    Date(DateCommand),
    /// Time selection
    #[command(subcommand)]
    Time(TimeCommand),
    /// Scroll the date strip to a day, growing the window if needed
    Scroll {
        #[arg(allow_hyphen_values = true)]
        day: String,
    },
    /// Report that the user scrolled near one end of the date strip
    Edge {
        #[arg(value_enum)]
        side: EdgeArg,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SlotsCommand {
    /// Replace all availability with the slots of one day
    Set {
        #[arg(allow_hyphen_values = true)]
        day: String,
        slots: Vec<String>,
    },
    /// Merge the slots of one day into the availability
    Put {
        #[arg(allow_hyphen_values = true)]
        day: String,
        slots: Vec<String>,
    },
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PriceCommand {
    /// Merge one day's price into the price data
    Put {
        #[arg(allow_hyphen_values = true)]
        day: String,
        value: f64,
        currency: String,
    },
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DateCommand {
    /// Select as the host would: idempotent, past dates allowed
    Select {
        #[arg(allow_hyphen_values = true)]
        day: String,
    },
    /// Tap as the user would: toggles, past dates ignored
    Tap {
        #[arg(allow_hyphen_values = true)]
        day: String,
    },
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TimeCommand {
    Select { slot: String },
    Tap { slot: String },
    Clear,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeArg {
    Start,
    End,
}

impl From<EdgeArg> for Edge {
    fn from(value: EdgeArg) -> Self {
        match value {
            EdgeArg::Start => Edge::Start,
            EdgeArg::End => Edge::End,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands_and_globals() {
        let cli = GlobalCli::parse_from([
            "reservation-picker",
            "-vv",
            "--today",
            "2024-01-10",
            "slots",
            "put",
            "tomorrow",
            "08:30",
            "20:15",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.today, NaiveDate::from_ymd_opt(2024, 1, 10));
        match cli.command {
            Command::Slots(SlotsCommand::Put { day, slots }) => {
                assert_eq!(day, "tomorrow");
                assert_eq!(slots, vec!["08:30", "20:15"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_edge_side() {
        let cli = GlobalCli::parse_from(["reservation-picker", "edge", "start"]);
        assert!(matches!(cli.command, Command::Edge { side: EdgeArg::Start }));
        assert_eq!(Edge::from(EdgeArg::End), Edge::End);
    }

    #[test]
    fn parses_price_put() {
        let cli = GlobalCli::parse_from(["reservation-picker", "price", "put", "+1d", "8.3", "$"]);
        match cli.command {
            Command::Price(PriceCommand::Put {
                day,
                value,
                currency,
            }) => {
                assert_eq!(day, "+1d");
                assert_eq!(value, 8.3);
                assert_eq!(currency, "$");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
