//! Report rendering
//!
//! CSV, name-value and legacy outputs are driven by the record's field
//! table; JSON and XML outputs serialize the whole record.

use crate::error::Result;
use crate::schema::{FlatField, Schema, View, flatten};
use quick_xml::se::Serializer as XmlSerializer;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Output format selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Csv,
    Nvp,
    Legacy,
    Json,
    PrettyJson,
    Xml,
    PrettyXml,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "nvp" => Ok(Self::Nvp),
            "legacy" => Ok(Self::Legacy),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty" => Ok(Self::PrettyJson),
            "xml" => Ok(Self::Xml),
            "pretty-xml" => Ok(Self::PrettyXml),
            other => Err(format!(
                "unknown report format '{}' (expected csv, nvp, legacy, json, pretty-json, xml or pretty-xml)",
                other
            )),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Csv => "csv",
            Self::Nvp => "nvp",
            Self::Legacy => "legacy",
            Self::Json => "json",
            Self::PrettyJson => "pretty-json",
            Self::Xml => "xml",
            Self::PrettyXml => "pretty-xml",
        };
        f.write_str(name)
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells.map(csv_escape).collect::<Vec<_>>().join(",")
}

/// Two-row CSV table: header row of names, then one row of values
pub fn to_csv<R: Schema>(record: &R) -> String {
    let flat = flatten(record, View::Csv);
    format!(
        "{}\n{}\n",
        csv_row(flat.iter().map(|f| f.name)),
        csv_row(flat.iter().map(|f| f.value.as_str()))
    )
}

/// One `name:value` line per field
pub fn to_nvp<R: Schema>(record: &R) -> String {
    flatten(record, View::Nvp)
        .iter()
        .map(|FlatField { name, value }| format!("{}:{}\n", name, value))
        .collect()
}

/// Compact comma-joined values, e.g. `host,serial`
pub fn to_legacy<R: Schema>(record: &R) -> String {
    let flat = flatten(record, View::Legacy);
    format!("{}\n", csv_row(flat.iter().map(|f| f.value.as_str())))
}

pub fn to_json<R: Serialize>(record: &R) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

pub fn to_pretty_json<R: Serialize>(record: &R) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// XML document rooted at the record's type name
pub fn to_xml<R: Serialize>(record: &R) -> Result<String> {
    Ok(quick_xml::se::to_string(record)?)
}

/// XML document indented by two spaces per level
pub fn to_pretty_xml<R: Serialize>(record: &R) -> Result<String> {
    let mut buffer = String::new();
    let mut serializer = XmlSerializer::new(&mut buffer);
    serializer.indent(' ', 2);
    record.serialize(serializer)?;
    Ok(buffer)
}

/// Render `record` in `format`
pub fn render<R: Schema + Serialize>(record: &R, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Csv => Ok(to_csv(record)),
        ReportFormat::Nvp => Ok(to_nvp(record)),
        ReportFormat::Legacy => Ok(to_legacy(record)),
        ReportFormat::Json => to_json(record),
        ReportFormat::PrettyJson => to_pretty_json(record),
        ReportFormat::Xml => to_xml(record),
        ReportFormat::PrettyXml => to_pretty_xml(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("csv".parse::<ReportFormat>(), Ok(ReportFormat::Csv));
        assert_eq!("NVP".parse::<ReportFormat>(), Ok(ReportFormat::Nvp));
        assert_eq!(
            "pretty-json".parse::<ReportFormat>(),
            Ok(ReportFormat::PrettyJson)
        );
        assert_eq!("xml".parse::<ReportFormat>(), Ok(ReportFormat::Xml));
        assert_eq!(
            "Pretty-XML".parse::<ReportFormat>(),
            Ok(ReportFormat::PrettyXml)
        );
        assert!("yaml".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_format_display_round_trips() {
        for format in [
            ReportFormat::Csv,
            ReportFormat::Nvp,
            ReportFormat::Legacy,
            ReportFormat::Json,
            ReportFormat::PrettyJson,
            ReportFormat::Xml,
            ReportFormat::PrettyXml,
        ] {
            assert_eq!(format.to_string().parse::<ReportFormat>(), Ok(format));
        }
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("Mag-Tek, Inc."), "\"Mag-Tek, Inc.\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
