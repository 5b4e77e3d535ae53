use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::domain::ResolvedTaxon;
use crate::error::ResolverError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTable {
    source: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl InputTable {
    pub fn read(path: &Path) -> Result<Self, ResolverError> {
        let file = fs::File::open(path)
            .map_err(|err| ResolverError::TableRead(format!("{}: {err}", path.display())))?;
        Self::from_reader(&path.display().to_string(), file)
    }

    pub fn from_reader<R: Read>(source: &str, reader: R) -> Result<Self, ResolverError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|err| ResolverError::TableRead(err.to_string()))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| ResolverError::TableRead(err.to_string()))?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self {
            source: source.to_string(),
            headers,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<Vec<Option<String>>, ResolverError> {
        let index = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| {
                let cell = row[index].trim();
                (!cell.is_empty()).then(|| cell.to_string())
            })
            .collect())
    }

    fn column_index(&self, name: &str) -> Result<usize, ResolverError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| ResolverError::MissingColumn {
                file: self.source.clone(),
                column: name.to_string(),
            })
    }

    /// Writes the selected input rows with the five resolution columns.
    /// Columns already named like a resolution column are overwritten.
    pub fn write_resolved<'a, W, I>(&self, writer: W, resolved: I) -> Result<usize, ResolverError>
    where
        W: Write,
        I: IntoIterator<Item = (usize, &'a ResolvedTaxon)>,
    {
        let mut headers = self.headers.clone();
        let mut targets = Vec::with_capacity(ResolvedTaxon::COLUMNS.len());
        for column in ResolvedTaxon::COLUMNS {
            match headers.iter().position(|header| header == column) {
                Some(index) => targets.push(index),
                None => {
                    headers.push(column.to_string());
                    targets.push(headers.len() - 1);
                }
            }
        }

        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(&headers)
            .map_err(|err| ResolverError::TableWrite(err.to_string()))?;
        let mut written = 0;
        for (index, taxon) in resolved {
            let Some(source) = self.rows.get(index) else {
                return Err(ResolverError::TableWrite(format!("no input row {index}")));
            };
            let mut row = source.clone();
            row.resize(headers.len(), String::new());
            for (target, cell) in targets.iter().zip(taxon.cells()) {
                row[*target] = cell;
            }
            writer
                .write_record(&row)
                .map_err(|err| ResolverError::TableWrite(err.to_string()))?;
            written += 1;
        }
        writer
            .flush()
            .map_err(|err| ResolverError::TableWrite(err.to_string()))?;
        Ok(written)
    }
}

pub fn csv_bytes(headers: &[&str], rows: &[Vec<String>]) -> Result<Vec<u8>, ResolverError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(headers)
        .map_err(|err| ResolverError::TableWrite(err.to_string()))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|err| ResolverError::TableWrite(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| ResolverError::TableWrite(err.to_string()))
}
