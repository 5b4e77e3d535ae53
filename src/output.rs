use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ChecklistInfo, LookupColumnResult, LookupResult, ResolveResult};
use crate::checklist::FetchOutcome;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_resolve(result: &ResolveResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_lookup(result: &LookupResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_lookup_column(result: &LookupColumnResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_fetch(result: &FetchOutcome) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_info(result: &ChecklistInfo) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
