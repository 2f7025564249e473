//! Plain-text rendering of reports for the terminal.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use weather_core::{ReportResource, ReportStatus};

const PLACEHOLDER: &str = "-";

fn or_placeholder(value: &str) -> &str {
    if value.is_empty() { PLACEHOLDER } else { value }
}

fn format_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|ts| {
        ts.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    })
    .unwrap_or_else(|| "never".to_string())
}

fn temperature(status: &ReportStatus) -> String {
    if status.temperature.is_empty() {
        return PLACEHOLDER.to_string();
    }
    format!("{}{}", status.temperature, status.unit)
}

pub fn list_header() -> String {
    format!("{:<32} {:<20} {:<8} {:>10}", "REPORT", "LOCATION", "STATE", "TEMP")
}

pub fn report_row(report: &ReportResource) -> String {
    format!(
        "{:<32} {:<20} {:<8} {:>10}",
        report.metadata.to_string(),
        report.spec.location,
        report.status.state.to_string(),
        temperature(&report.status)
    )
}

pub fn status_line(status: &ReportStatus) -> String {
    format!(
        "{}: {} (feels like {}{}), humidity {}%, wind {} from {}°",
        status.state,
        temperature(status),
        or_placeholder(&status.feels_like),
        status.unit,
        or_placeholder(&status.relative_humidity),
        or_placeholder(&status.windspeed),
        or_placeholder(&status.winddirection),
    )
}

/// Multi-line description of one report, as printed by `get`.
pub struct ReportDetails<'a>(pub &'a ReportResource);

impl fmt::Display for ReportDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let status = &report.status;

        writeln!(f, "Report:          {}", report.metadata)?;
        writeln!(f, "Location:        {}", report.spec.location)?;
        writeln!(f, "Units:           {}", report.spec.units)?;
        writeln!(f, "State:           {}", status.state)?;
        writeln!(f, "Temperature:     {}", temperature(status))?;
        writeln!(f, "Feels like:      {}", or_placeholder(&status.feels_like))?;
        writeln!(f, "Humidity:        {}", or_placeholder(&status.relative_humidity))?;
        writeln!(f, "Wind speed:      {}", or_placeholder(&status.windspeed))?;
        writeln!(f, "Wind direction:  {}", or_placeholder(&status.winddirection))?;
        writeln!(f, "Last reconciled: {}", format_time(status.last_reconciled))
    }
}
