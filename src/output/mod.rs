//! Output formatting for scan and lookup results

use crate::dns::{DnsRecord, RecordKind};
use crate::scanner::{HostRecord, PortRecord};
use crate::ScanError;
use comfy_table::{presets, Cell, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" | "txt" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Header plus rows, ready to render.
///
/// An all-empty row separates groups in table output and is skipped by the
/// machine-readable formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn push_separator(&mut self) {
        self.rows.push(vec![String::new(); self.header.len()]);
    }

    /// Result of `net`
    pub fn hosts(records: &[HostRecord]) -> Self {
        let mut report = Self::new(&["Host", "Status", "MAC Address", "Manufacturer"]);
        for record in records {
            report.push_row(vec![
                record.ip.to_string(),
                "UP".to_string(),
                record.mac.map(|mac| mac.to_string()).unwrap_or_default(),
                record.vendor.clone().unwrap_or_default(),
            ]);
        }
        report
    }

    /// Result of `port`
    pub fn ports(records: &[PortRecord]) -> Self {
        let mut report = Self::new(&["Port", "Protocol", "Service Name", "Description"]);
        for record in records {
            report.push_row(vec![
                record.port.to_string(),
                record.protocol.to_string(),
                record.service_name.clone(),
                record.description.clone(),
            ]);
        }
        report
    }

    /// Result of `dig` and the single-record commands; record types are
    /// grouped with a blank row between groups
    pub fn dns(records: &[DnsRecord]) -> Self {
        let mut report = Self::new(&["Domain", "Type", "Value"]);
        let mut previous: Option<RecordKind> = None;

        for record in records {
            let group = dns_group(record.kind);
            if previous.is_some_and(|kind| dns_group(kind) != group) {
                report.push_separator();
            }
            previous = Some(record.kind);

            report.push_row(vec![
                record.domain.clone(),
                record.kind.to_string(),
                record.value.clone(),
            ]);
        }
        report
    }

    pub fn is_empty(&self) -> bool {
        self.data_rows().next().is_none()
    }

    fn data_rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.rows.iter().filter(|row| row.iter().any(|cell| !cell.is_empty()))
    }

    pub fn render(&self, format: OutputFormat) -> crate::Result<String> {
        match format {
            OutputFormat::Table => Ok(self.render_table()),
            OutputFormat::Json => self.render_json(),
            OutputFormat::Csv => self.render_csv(),
        }
    }

    fn render_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Disabled)
            .set_header(self.header.iter().map(|h| Cell::new(h.to_uppercase())));

        for row in &self.rows {
            table.add_row(row.iter().map(Cell::new));
        }

        table.to_string()
    }

    fn render_json(&self) -> crate::Result<String> {
        let objects: Vec<Value> = self
            .data_rows()
            .map(|row| {
                let object: Map<String, Value> = self
                    .header
                    .iter()
                    .zip(row)
                    .map(|(key, value)| (json_key(key), Value::String(value.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect();

        Ok(serde_json::to_string_pretty(&objects)?)
    }

    fn render_csv(&self) -> crate::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in self.data_rows() {
            writer.write_record(row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ScanError::OutputError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ScanError::OutputError(e.to_string()))
    }
}

/// A and AAAA share a group
fn dns_group(kind: RecordKind) -> RecordKind {
    match kind {
        RecordKind::Aaaa => RecordKind::A,
        other => other,
    }
}

/// `MAC Address` -> `mac_address`
fn json_key(header: &str) -> String {
    header.to_lowercase().replace(' ', "_")
}
