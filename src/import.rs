//! Loaders for the delimited source files the shards are built from.
//!
//! - GeoNames postal dump (`allCountries.txt`): tab separated, no header.
//! - Italian municipality list (`listacomuni.txt`): `;` separated, with header.
//!
//! Invalid UTF-8 is replaced rather than rejected; both sources are known to
//! carry a few stray bytes.

use crate::error::{ImportError, Result};
use crate::record::{MunicipalRecord, PostalRecord};
use std::io::BufRead;
use std::str::FromStr;

/// Header of the municipality list.
pub const COMUNI_HEADER: [&str; 9] = [
    "Istat", "Comune", "Provincia", "Regione", "Prefisso", "CAP", "CodFisco", "Abitanti", "Link",
];

/// Rows read from a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Imported<T> {
    pub records: Vec<T>,
    /// Lines dropped because their postal code is not numeric
    pub skipped: usize,
}

fn lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, String)>> {
    reader.split(b'\n').enumerate().map(|(index, line)| {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok((index + 1, String::from_utf8_lossy(&line).into_owned()))
    })
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_optional<T: FromStr>(value: Option<&str>, column: &str, line: usize) -> Result<Option<T>> {
    match optional(value) {
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|_| ImportError::new(line, format!("invalid {}: {:?}", column, text)).into()),
        None => Ok(None),
    }
}

/// Reads a GeoNames postal code dump.
///
/// Rows with a non-numeric postal code are skipped and counted. `coordinates`
/// is filled with `"lat,lon"` when both are present.
pub fn read_geonames<R: BufRead>(reader: R) -> Result<Imported<PostalRecord>> {
    let mut imported = Imported {
        records: Vec::new(),
        skipped: 0,
    };

    for entry in lines(reader) {
        let (number, line) = entry?;
        if line.trim().is_empty() {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 3 {
            return Err(
                ImportError::new(number, "expected at least 3 tab separated columns").into(),
            );
        }

        let countrycode = columns[0].trim();
        if countrycode.is_empty() {
            return Err(ImportError::new(number, "missing country code").into());
        }

        let postalcode = match columns[1].trim().parse::<u32>() {
            Ok(code) => code,
            Err(_) => {
                imported.skipped += 1;
                continue;
            }
        };

        let column = |index: usize| columns.get(index).copied();
        let mut record = PostalRecord::new(countrycode, postalcode, columns[2].trim());
        record.adminname1 = optional(column(3));
        record.admincode1 = optional(column(4));
        record.adminname2 = optional(column(5));
        record.admincode2 = optional(column(6));
        record.adminname3 = optional(column(7));
        record.admincode3 = optional(column(8));
        record.latitude = parse_optional(column(9), "latitude", number)?;
        record.longitude = parse_optional(column(10), "longitude", number)?;
        record.accuracy = parse_optional(column(11), "accuracy", number)?;
        if let (Some(lat), Some(lon)) = (record.latitude, record.longitude) {
            record.coordinates = Some(format!("{},{}", lat, lon));
        }

        imported.records.push(record);
    }

    if imported.skipped > 0 {
        tracing::debug!(skipped = imported.skipped, "non-numeric postal codes skipped");
    }
    Ok(imported)
}

/// Reads the Italian municipality list.
///
/// Cities spanning several postal codes carry a wildcard CAP such as `001xx`;
/// those rows are skipped and counted.
pub fn read_comuni<R: BufRead>(reader: R) -> Result<Imported<MunicipalRecord>> {
    let mut imported = Imported {
        records: Vec::new(),
        skipped: 0,
    };
    let mut header_seen = false;

    for entry in lines(reader) {
        let (number, line) = entry?;
        if line.trim().is_empty() {
            continue;
        }

        let columns: Vec<&str> = line.split(';').map(str::trim).collect();
        if !header_seen {
            let header = line.trim_start_matches('\u{feff}');
            let names: Vec<&str> = header.split(';').map(str::trim).collect();
            if names != COMUNI_HEADER {
                return Err(ImportError::new(number, format!("unexpected header: {}", line)).into());
            }
            header_seen = true;
            continue;
        }

        if columns.len() != COMUNI_HEADER.len() {
            return Err(ImportError::new(
                number,
                format!("expected {} columns, found {}", COMUNI_HEADER.len(), columns.len()),
            )
            .into());
        }

        let istat = columns[0]
            .parse::<u32>()
            .map_err(|_| ImportError::new(number, format!("invalid Istat: {:?}", columns[0])))?;
        let cap = match columns[5].parse::<u32>() {
            Ok(cap) => cap,
            Err(_) => {
                imported.skipped += 1;
                continue;
            }
        };

        let column = |index: usize| columns.get(index).copied();
        let mut record = MunicipalRecord::new(istat, columns[1], cap);
        record.provincia = optional(column(2));
        record.regione = optional(column(3));
        record.prefisso = parse_optional(column(4), "Prefisso", number)?;
        record.cod_fisco = optional(column(6));
        record.abitanti = parse_optional(column(7), "Abitanti", number)?;
        record.link = optional(column(8));

        imported.records.push(record);
    }

    if imported.skipped > 0 {
        tracing::debug!(skipped = imported.skipped, "wildcard CAP rows skipped");
    }
    Ok(imported)
}
