use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_project_datetime;
use crate::display::{DisplayRow, format_time_left};
use crate::event::{Event, State};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_event_table(&mut self, rows: &[DisplayRow]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if rows.is_empty() {
            writeln!(out, "No matching events.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Left".to_string(),
            "Name".to_string(),
            "Description".to_string(),
        ];

        let mut table = Vec::with_capacity(rows.len());
        for row in rows {
            let id = self.paint(&row.position.to_string(), "33");
            let due = format_project_datetime(row.due);
            let left = match row.state {
                State::Done => self.paint(&row.time_left, "32"),
                State::Passed => self.paint(&row.time_left, "31"),
                State::WillBe => row.time_left.clone(),
            };

            table.push(vec![id, due, left, row.name.clone(), row.description.clone()]);
        }

        write_table(&mut out, headers, table)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, event, now))]
    pub fn print_event_info(&mut self, event: &Event, now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "name         {}", event.name)?;
        writeln!(out, "uuid         {}", event.uuid)?;
        writeln!(out, "state        {}", event.state.as_str())?;
        writeln!(out, "description  {}", event.description)?;
        writeln!(out, "due          {}", format_project_datetime(event.due))?;
        if event.state == State::WillBe {
            writeln!(
                out,
                "left         {}",
                format_time_left(Some(event.due), now)
            )?;
        }
        writeln!(out, "entry        {}", format_project_datetime(event.entry))?;
        writeln!(
            out,
            "modified     {}",
            format_project_datetime(event.modified)
        )?;

        Ok(())
    }

    pub fn clear_screen(&mut self) {
        if self.color && io::stdout().is_terminal() {
            print!("\x1b[2J\x1b[H");
            let _ = io::stdout().flush();
        }
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

#[cfg(test)]
mod tests {
    use super::{strip_ansi, write_table};

    #[test]
    fn stripping_ansi_leaves_plain_text() {
        assert_eq!(strip_ansi("\x1b[31mPassed\x1b[0m"), "Passed");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn table_columns_align_on_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["ID".to_string(), "Name".to_string()],
            vec![
                vec!["1".to_string(), "short".to_string()],
                vec!["2".to_string(), "a longer name".to_string()],
            ],
        )
        .expect("write table");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("ID "));
        assert!(lines[1].starts_with("--"));
        assert!(lines[2].starts_with("1  short"));
    }
}
