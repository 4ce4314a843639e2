use crate::error::{Result, WarehouseError};
use crate::util::clock::Timestamp;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[derive(Clone, Debug, PartialEq)]
pub struct VisitEvent {
    pub at: Timestamp,
    pub bin_id: String,
    pub weight: f64,
}

pub fn parse<P: AsRef<Path>>(filename: P) -> Result<Vec<VisitEvent>> {
    let file = File::open(filename.as_ref())?;
    parse_reader(BufReader::new(file))
}

pub fn parse_str(text: &str) -> Result<Vec<VisitEvent>> {
    parse_reader(text.as_bytes())
}

fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<VisitEvent>> {
    let mut events = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(WarehouseError::InvalidInput(format!(
                "events line {}: expected '<timestamp_ms> <binId> [weight]'",
                i + 1
            )));
        }
        let at = parts[0].parse::<u64>().map_err(|_| {
            WarehouseError::InvalidInput(format!(
                "events line {}: invalid timestamp '{}'",
                i + 1,
                parts[0]
            ))
        })?;
        let weight = match parts.get(2) {
            Some(w) => w.parse::<f64>().map_err(|_| {
                WarehouseError::InvalidInput(format!("events line {}: invalid weight '{}'", i + 1, w))
            })?,
            None => 1.0,
        };
        events.push(VisitEvent {
            at: Timestamp(at),
            bin_id: parts[1].to_string(),
            weight,
        });
    }
    Ok(events)
}

pub fn write<P: AsRef<Path>>(events: &[VisitEvent], filename: P) -> std::io::Result<()> {
    let mut file = File::create(filename)?;
    writeln!(file, "# timestamp_ms bin_id weight")?;
    for e in events {
        writeln!(file, "{} {} {}", e.at.millis(), e.bin_id, e.weight)?;
    }
    Ok(())
}
