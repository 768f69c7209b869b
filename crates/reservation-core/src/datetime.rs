use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::calendar::shift_days;

pub const TIMEZONE_ENV_VAR: &str =
  "RESERVATION_PICKER_TIMEZONE";

/// Source of "today". Queried on every call so a long-lived picker follows
/// midnight rollover.
pub trait Clock {
  fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
  timezone: Tz
}

impl SystemClock {
  pub fn new(timezone: Tz) -> Self {
    Self { timezone }
  }

  pub fn timezone(&self) -> Tz {
    self.timezone
  }
}

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate {
    Utc::now()
      .with_timezone(&self.timezone)
      .date_naive()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
  fn today(&self) -> NaiveDate {
    self.0
  }
}

/// Configured zone first, then the env var, then UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  chrono_tz::UTC
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured picker timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_day_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(shift_days(today, 1));
    }
    | "yesterday" => {
      return Ok(shift_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)d$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    return Ok(shift_days(
      today,
      if sign == "-" { -num } else { num }
    ));
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .map_err(|_| {
    anyhow!(
      "unrecognized day expression: \
       {input}"
    )
  })
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd, YYYY-MM-DD"
  })
}

/// Parses a slot either as a full date-time or as a clock time on `day`.
pub fn parse_slot_expr(
  input: &str,
  day: Option<NaiveDate>
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  let Some(day) = day else {
    return Err(anyhow!(
      "slot needs a date: {input} \
       (use YYYY-MM-DD HH:MM)"
    ));
  };

  let time = parse_clock_time(token)
    .ok_or_else(|| {
      anyhow!(
        "unrecognized slot expression: \
         {input}"
      )
    })?;
  Ok(day.and_time(time))
}

fn parse_clock_time(
  token: &str
) -> Option<NaiveTime> {
  let clock_re = Regex::new(
    r"^(?P<hour>\d{1,2}):(?P<minute>\d{2})$"
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  shift_days(from, delta)
}
