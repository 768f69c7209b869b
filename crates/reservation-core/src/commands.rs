use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument};

use crate::cli::{Command, DateCommand, PriceCommand, SlotsCommand, TimeCommand};
use crate::config::PickerConfig;
use crate::controller::PickerController;
use crate::datetime::{Clock, parse_day_expr, parse_slot_expr};
use crate::model::{AvailabilityMap, Price, PriceMap};
use crate::render::Renderer;
use crate::scheduler::Edge;
use crate::statestore::StateStore;

/// Listener output collected during one invocation.
pub type EventLog = Rc<RefCell<Vec<String>>>;

/// Loads the saved state, applies one command, prints what happened and
/// saves again.
#[instrument(skip(store, cfg, renderer, clock, command))]
pub fn dispatch(
    store: &StateStore,
    cfg: &PickerConfig,
    renderer: &mut Renderer,
    clock: Box<dyn Clock>,
    command: Command,
) -> anyhow::Result<()> {
    if let Command::Reset = command {
        store.reset()?;
        println!("Saved picker state removed.");
        return Ok(());
    }

    let mut picker = PickerController::new(cfg, clock);
    let events = attach_event_log(&mut picker);

    let blob = store.load_blob()?;
    picker.on_restore_state(blob.as_deref());
    picker.on_attach();
    let startup = picker.take_render_instructions();
    debug!(count = startup.len(), "discarded attach instructions");

    match &command {
        Command::Show { days } => {
            let focus = picker.first_visible().unwrap_or(0);
            let cells = picker.date_cells(focus..focus.saturating_add(*days));
            renderer.print_date_strip(&cells, Some(focus))?;
            println!();
            renderer.print_time_strip(&picker.time_cells(), picker.time_slots().is_visible())?;
        }
        Command::Export => {
            let state = picker.on_save_state()?;
            let out = serde_json::to_string_pretty(&state)?;
            println!("{out}");
        }
        other => {
            apply_command(&mut picker, other)?;
            let ran = picker.run_deferred();
            debug!(ran, "ran deferred tasks");

            let lines: Vec<String> = events.borrow_mut().drain(..).collect();
            renderer.print_lines(lines)?;
            let instructions = picker.take_render_instructions();
            info!(count = instructions.len(), "render instructions");
            renderer.print_lines(instructions.iter().map(ToString::to_string))?;
        }
    }

    let state = picker.on_save_state()?;
    store.save(&state).context("failed to save picker state")?;
    Ok(())
}

/// Registers listeners that record every selection event as a text line.
pub fn attach_event_log(picker: &mut PickerController) -> EventLog {
    let events: EventLog = Rc::new(RefCell::new(Vec::new()));

    let dates = Rc::clone(&events);
    picker.add_on_date_selected_listener(Rc::new(move |date: Option<NaiveDate>| {
        let value = date.map_or_else(|| "none".to_string(), |d| d.to_string());
        dates.borrow_mut().push(format!("date-selected {value}"));
    }));

    let times = Rc::clone(&events);
    picker.add_on_time_selected_listener(Rc::new(move |time: Option<NaiveDateTime>| {
        let value = time.map_or_else(|| "none".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        times.borrow_mut().push(format!("time-selected {value}"));
    }));

    events
}

/// Maps a mutating command onto controller calls.
#[instrument(skip(picker))]
pub fn apply_command(picker: &mut PickerController, command: &Command) -> anyhow::Result<()> {
    let today = picker.today();

    match command {
        Command::Slots(SlotsCommand::Set { day, slots }) => {
            let data = availability_for(day, slots, today)?;
            picker.set_time_availability_data(data);
        }
        Command::Slots(SlotsCommand::Put { day, slots }) => {
            let data = availability_for(day, slots, today)?;
            picker.put_time_availability_data(data);
        }
        Command::Slots(SlotsCommand::Clear) => picker.clear_time_availability_data(),
        Command::Price(PriceCommand::Put {
            day,
            value,
            currency,
        }) => {
            if !value.is_finite() {
                return Err(anyhow!("price must be a finite number, got {value}"));
            }
            let date = parse_day_expr(day, today)?;
            let mut data = PriceMap::new();
            data.insert(date, Price::new(*value, currency.as_str()));
            picker.put_price_data(data);
        }
        Command::Price(PriceCommand::Clear) => picker.clear_price_data(),
        Command::Date(DateCommand::Select { day }) => {
            picker.set_selected_date(parse_day_expr(day, today)?);
        }
        Command::Date(DateCommand::Tap { day }) => {
            picker.on_date_tapped(parse_day_expr(day, today)?);
        }
        Command::Date(DateCommand::Clear) => picker.clear_selected_date(),
        Command::Time(TimeCommand::Select { slot }) => {
            let time = parse_slot_expr(slot, picker.selection().date)?;
            picker.set_selected_time(time);
        }
        Command::Time(TimeCommand::Tap { slot }) => {
            let time = parse_slot_expr(slot, picker.selection().date)?;
            picker.on_time_tapped(time);
        }
        Command::Time(TimeCommand::Clear) => picker.clear_selected_time(),
        Command::Scroll { day } => {
            let date = parse_day_expr(day, today)?;
            if picker.scroll_to_date(date).is_none() {
                return Err(anyhow!("cannot scroll to {date}"));
            }
        }
        Command::Edge { side } => {
            let posted = match Edge::from(*side) {
                Edge::Start => picker.on_near_start_of_visible_range(),
                Edge::End => picker.on_near_end_of_visible_range(),
            };
            debug!(posted, ?side, "edge request");
        }
        Command::Show { .. } | Command::Export | Command::Reset => {
            return Err(anyhow!("command does not change the picker"));
        }
    }

    Ok(())
}

fn availability_for(
    day: &str,
    slots: &[String],
    today: NaiveDate,
) -> anyhow::Result<AvailabilityMap> {
    let date = parse_day_expr(day, today)?;
    let mut parsed = Vec::with_capacity(slots.len());
    for slot in slots {
        let time = parse_slot_expr(slot, Some(date))?;
        if time.date() != date {
            return Err(anyhow!("slot {slot} is not on {date}"));
        }
        parsed.push(time);
    }

    let mut data = AvailabilityMap::new();
    data.insert(date, parsed);
    Ok(data)
}
