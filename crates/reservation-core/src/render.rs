use std::fmt;
use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::PickerConfig;
use crate::model::{DateCell, TimeCell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strip {
    Dates,
    Times,
}

/// Patch instructions for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderInstruction {
    Invalidate(Strip),
    RangeInserted { strip: Strip, index: usize, count: usize },
    ItemChanged { strip: Strip, index: usize },
    ShowTimeStrip,
    HideTimeStrip,
    ScrollTo { index: usize },
}

impl fmt::Display for RenderInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderInstruction::Invalidate(strip) => write!(f, "invalidate {strip:?}"),
            RenderInstruction::RangeInserted {
                strip,
                index,
                count,
            } => write!(f, "insert {strip:?} at {index} count {count}"),
            RenderInstruction::ItemChanged { strip, index } => {
                write!(f, "changed {strip:?} at {index}")
            }
            RenderInstruction::ShowTimeStrip => write!(f, "show Times"),
            RenderInstruction::HideTimeStrip => write!(f, "hide Times"),
            RenderInstruction::ScrollTo { index } => write!(f, "scroll Dates to {index}"),
        }
    }
}

/// Receiver of render instructions.
pub trait RenderSink {
    fn apply(&mut self, instruction: RenderInstruction);
}

impl RenderSink for Vec<RenderInstruction> {
    fn apply(&mut self, instruction: RenderInstruction) {
        self.push(instruction);
    }
}

/// Plain-text rendering of both strips for terminal hosts.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &PickerConfig) -> Self {
        Self {
            color: cfg.display.color,
        }
    }

    #[tracing::instrument(skip(self, cells))]
    pub fn print_date_strip(&mut self, cells: &[DateCell], focus: Option<usize>) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_date_strip(out, cells, focus)
    }

    #[tracing::instrument(skip(self, cells))]
    pub fn print_time_strip(&mut self, cells: &[TimeCell], visible: bool) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_time_strip(out, cells, visible)
    }

    pub fn print_lines<I>(&mut self, lines: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut out = io::stdout().lock();
        for line in lines {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    pub fn write_date_strip<W: Write>(
        &self,
        writer: W,
        cells: &[DateCell],
        focus: Option<usize>,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "#".to_string(),
            "Day".to_string(),
            "Date".to_string(),
            "Month".to_string(),
            "Min".to_string(),
            "".to_string(),
        ];

        let mut rows = Vec::with_capacity(cells.len());
        for (offset, cell) in cells.iter().enumerate() {
            let index = focus.unwrap_or(0) + offset;
            let mut day = cell.date.format("%a").to_string();
            let mut number = cell.date.format("%d").to_string();
            let mut month = cell.date.format("%b").to_string();
            let mut price = cell.price_label();
            if !cell.selectable {
                day = self.paint(&day, "2");
                number = self.paint(&number, "2");
                month = self.paint(&month, "2");
                price = self.paint(&price, "2");
            }
            let mark = if cell.selected {
                self.paint("*", "32")
            } else {
                String::new()
            };
            rows.push(vec![index.to_string(), day, number, month, price, mark]);
        }

        write_table(writer, headers, rows)
    }

    pub fn write_time_strip<W: Write>(
        &self,
        mut writer: W,
        cells: &[TimeCell],
        visible: bool,
    ) -> anyhow::Result<()> {
        if !visible {
            writeln!(writer, "(no time slots)")?;
            return Ok(());
        }

        let headers = vec!["#".to_string(), "Time".to_string(), "".to_string()];
        let rows = cells
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let mark = if cell.selected {
                    self.paint("*", "32")
                } else {
                    String::new()
                };
                vec![index.to_string(), cell.slot.format("%H:%M").to_string(), mark]
            })
            .collect();

        write_table(writer, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
