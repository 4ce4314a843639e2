use crate::db::core::{GridLayout, LayoutBuilder};
use crate::error::{LayoutError, Result};
use crate::geom::coord::GridCoord;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

struct PendingBin {
    id: String,
    cell: GridCoord,
    skus: Vec<String>,
}

fn syntax(line: usize, msg: impl Into<String>) -> LayoutError {
    LayoutError::Syntax {
        line,
        msg: msg.into(),
    }
}

fn parse_u32(token: Option<&&str>, line: usize, what: &str) -> std::result::Result<u32, LayoutError> {
    let token = token.ok_or_else(|| syntax(line, format!("missing {}", what)))?;
    token
        .trim_matches(';')
        .parse::<u32>()
        .map_err(|_| syntax(line, format!("invalid {} '{}'", what, token)))
}

pub fn parse<P: AsRef<Path>>(filename: P) -> Result<GridLayout> {
    let file = File::open(filename.as_ref())?;
    parse_reader(BufReader::new(file))
}

pub fn parse_str(text: &str) -> Result<GridLayout> {
    parse_reader(text.as_bytes())
}

fn parse_reader<R: BufRead>(reader: R) -> Result<GridLayout> {
    let mut name = "warehouse".to_string();
    let mut version = 1;
    let mut size: Option<(u32, u32)> = None;
    let mut rows: Vec<String> = Vec::new();
    let mut bins: Vec<PendingBin> = Vec::new();

    let mut in_grid = false;
    let mut in_bins = false;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || (!in_grid && trimmed.starts_with('#')) {
            continue;
        }

        if in_grid {
            if trimmed.starts_with("END") {
                in_grid = false;
            } else {
                rows.push(trimmed.to_string());
            }
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts[0] {
            "LAYOUT" => {
                if let Some(n) = parts.get(1) {
                    name = n.trim_matches(';').to_string();
                }
                if let Some(pos) = parts.iter().position(|&p| p == "VERSION") {
                    version = parse_u32(parts.get(pos + 1), line_no, "version")? as u64;
                }
            }
            "SIZE" => {
                let w = parse_u32(parts.get(1), line_no, "width")?;
                let h = parse_u32(parts.get(2), line_no, "height")?;
                size = Some((w, h));
            }
            "GRID" => in_grid = true,
            "BINS" => in_bins = true,
            "END" => {
                if parts.get(1) == Some(&"BINS") {
                    in_bins = false;
                }
            }
            "-" if in_bins => {
                let id = parts
                    .get(1)
                    .ok_or_else(|| syntax(line_no, "bin entry without id"))?
                    .to_string();
                let open = parts
                    .iter()
                    .position(|&p| p == "(")
                    .ok_or_else(|| syntax(line_no, format!("bin '{}' has no coordinate", id)))?;
                let x = parse_u32(parts.get(open + 1), line_no, "bin x")?;
                let y = parse_u32(parts.get(open + 2), line_no, "bin y")?;

                let mut skus = Vec::new();
                if let Some(pos) = parts.iter().position(|&p| p == "SKU") {
                    for &sku in &parts[pos + 1..] {
                        let sku = sku.trim_matches(';');
                        if !sku.is_empty() {
                            skus.push(sku.to_string());
                        }
                    }
                }
                bins.push(PendingBin {
                    id,
                    cell: GridCoord::new(x, y),
                    skus,
                });
            }
            other => {
                log::debug!("Layout line {}: ignoring '{}'", line_no, other);
            }
        }
    }

    if in_grid {
        return Err(syntax(rows.len(), "GRID section not terminated").into());
    }

    let mut builder = LayoutBuilder::from_rows(&rows)?.name(name).version(version);
    if let Some((w, h)) = size {
        let rows_w = rows.first().map(|r| r.chars().count()).unwrap_or(0) as u32;
        if w != rows_w || h != rows.len() as u32 {
            return Err(syntax(
                0,
                format!(
                    "SIZE {}x{} does not match GRID {}x{}",
                    w,
                    h,
                    rows_w,
                    rows.len()
                ),
            )
            .into());
        }
    }
    for bin in bins {
        builder.add_bin(bin.id, bin.cell, bin.skus);
    }
    Ok(builder.build()?)
}

pub fn write<P: AsRef<Path>>(layout: &GridLayout, filename: P) -> std::io::Result<()> {
    let mut file = File::create(filename)?;

    writeln!(
        file,
        "LAYOUT {} VERSION {} ;",
        layout.name(),
        layout.version()
    )?;
    writeln!(file, "SIZE {} {} ;", layout.width(), layout.height())?;

    writeln!(file, "GRID")?;
    for row in layout.rows() {
        writeln!(file, "{}", row)?;
    }
    writeln!(file, "END GRID")?;

    writeln!(file, "BINS {} ;", layout.num_bins())?;
    for bin in layout.bins() {
        write!(file, "- {} ( {} {} )", bin.id, bin.cell.x, bin.cell.y)?;
        if !bin.sku_ids.is_empty() {
            write!(file, " SKU")?;
            for sku in &bin.sku_ids {
                write!(file, " {}", sku)?;
            }
        }
        writeln!(file, " ;")?;
    }
    writeln!(file, "END BINS")?;
    Ok(())
}
