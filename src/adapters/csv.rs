//! Reading addresses from and writing coordinates back into CSV files.
//!
//! All columns of the input are kept. The coordinate columns are replaced
//! if they already exist, otherwise they are appended.

use anyhow::{anyhow, bail, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::{collections::HashMap, path::Path};
use voirie_core::entities::{address::AddressRow, resolution::ResolutionResult};

pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";
pub const PROVENANCE_COLUMN: &str = "provenance";

#[derive(Debug)]
pub struct AddressTable {
    headers: StringRecord,
    records: Vec<StringRecord>,
    address_column: usize,
}

impl AddressTable {
    pub fn read_from_path<P: AsRef<Path>>(
        path: P,
        delimiter: u8,
        address_column: &str,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;
        let headers = rdr.headers()?.clone();
        let address_column = headers
            .iter()
            .position(|h| h.trim() == address_column)
            .ok_or_else(|| {
                anyhow!(
                    "Column '{address_column}' not found in {}",
                    path.display()
                )
            })?;
        let records = rdr.records().collect::<Result<Vec<_>, _>>()?;
        // Short records are padded on write, longer ones have no column to go to.
        if let Some((idx, record)) = records
            .iter()
            .enumerate()
            .find(|(_, record)| record.len() > headers.len())
        {
            bail!(
                "Row {} of {} has {} fields but the header only {}",
                idx + 1,
                path.display(),
                record.len(),
                headers.len()
            );
        }
        log::info!("Read {} rows from {}", records.len(), path.display());
        Ok(Self {
            headers,
            records,
            address_column,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// One row per record, identified by its position.
    pub fn rows(&self) -> Vec<AddressRow> {
        self.records
            .iter()
            .enumerate()
            .map(|(id, record)| AddressRow::new(id, record.get(self.address_column)))
            .collect()
    }

    pub fn write_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        delimiter: u8,
        results: &[ResolutionResult],
    ) -> Result<()> {
        let path = path.as_ref();
        let mut headers: Vec<String> = self.headers.iter().map(ToOwned::to_owned).collect();
        let mut column = |name: &str| {
            let idx = headers.iter().position(|h| h == name);
            idx.unwrap_or_else(|| {
                headers.push(name.to_owned());
                headers.len() - 1
            })
        };
        let lat = column(LATITUDE_COLUMN);
        let lng = column(LONGITUDE_COLUMN);
        let provenance = column(PROVENANCE_COLUMN);

        let results: HashMap<usize, &ResolutionResult> =
            results.iter().map(|r| (r.row, r)).collect();
        let mut wtr = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
        wtr.write_record(&headers)?;
        for (id, record) in self.records.iter().enumerate() {
            let mut fields: Vec<String> = record.iter().map(ToOwned::to_owned).collect();
            fields.resize(headers.len(), String::new());
            let result = results.get(&id).copied();
            fields[lat] = result
                .and_then(ResolutionResult::pos)
                .map(|pos| format!("{:.6}", pos.lat))
                .unwrap_or_default();
            fields[lng] = result
                .and_then(ResolutionResult::pos)
                .map(|pos| format!("{:.6}", pos.lng))
                .unwrap_or_default();
            fields[provenance] = result
                .and_then(ResolutionResult::provenance)
                .map(|p| p.to_string())
                .unwrap_or_default();
            wtr.write_record(&fields)?;
        }
        wtr.flush()?;
        log::info!("Wrote {} rows to {}", self.records.len(), path.display());
        Ok(())
    }
}
