pub mod calendar;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod controller;
pub mod datetime;
pub mod error;
pub mod listeners;
pub mod model;
pub mod render;
pub mod scheduler;
pub mod selection;
pub mod slots;
pub mod statestore;
pub mod window;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use controller::PickerController;
pub use error::PickerError;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting reservation picker"
  );

  let cfg = config::PickerConfig::load(
    cli.config.as_deref()
  )?;

  let clock: Box<dyn datetime::Clock> =
    match cli.today {
      | Some(day) => {
        debug!(%day, "using pinned today");
        Box::new(datetime::FixedClock(day))
      }
      | None => {
        Box::new(datetime::SystemClock::new(
          datetime::resolve_timezone(
            cfg.timezone.as_deref()
          )
        ))
      }
    };

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    statestore::StateStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open state store at \
         {}",
        data_dir.display()
      )
    })?;

  let mut renderer =
    render::Renderer::new(&cfg);

  commands::dispatch(
    &store,
    &cfg,
    &mut renderer,
    clock,
    cli.command
  )?;

  info!("done");
  Ok(())
}
