// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store-only ZIP encoder.
//
// Bundles several named byte payloads into one archive without compression:
// local headers and data in input order, then the central directory, then the
// end-of-central-directory record. Names are written as UTF-8 (flag bit 11).
// ZIP64 is not supported; archives are capped at 65535 entries and 4 GiB.

use std::collections::HashSet;

use blattwerk_core::error::BlattwerkError;
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use tracing::{debug, instrument};

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// 1.0: stored entries only.
const VERSION_NEEDED: u16 = 10;
/// 2.0, MS-DOS attribute compatibility.
const VERSION_MADE_BY: u16 = 20;
/// Bit 11: file name is UTF-8.
const FLAG_UTF8: u16 = 0x0800;
const METHOD_STORED: u16 = 0;

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Encode `entries` with the current local time as every entry's timestamp.
pub fn encode_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>, BlattwerkError> {
    encode_archive_at(entries, Local::now().naive_local())
}

/// Encode `entries`, stamping each with `modified`.
///
/// Output is deterministic for a given input and timestamp.
#[instrument(skip_all, fields(entries = entries.len()))]
pub fn encode_archive_at(
    entries: &[ArchiveEntry],
    modified: NaiveDateTime,
) -> Result<Vec<u8>, BlattwerkError> {
    if entries.len() > usize::from(u16::MAX) {
        return Err(BlattwerkError::Archive(format!(
            "{} entries exceed the 65535-entry limit",
            entries.len()
        )));
    }
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.name.is_empty() {
            return Err(BlattwerkError::Archive("entry name is empty".to_string()));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(BlattwerkError::Archive(format!(
                "duplicate entry name: {}",
                entry.name
            )));
        }
    }

    let (dos_time, dos_date) = dos_timestamp(modified);
    let mut out = Vec::new();
    let mut central = Vec::new();

    for entry in entries {
        let name = entry.name.as_bytes();
        let name_len = u16::try_from(name.len()).map_err(|_| {
            BlattwerkError::Archive(format!("entry name too long: {}", entry.name))
        })?;
        let size = u32::try_from(entry.data.len()).map_err(|_| {
            BlattwerkError::Archive(format!("entry {} exceeds 4 GiB", entry.name))
        })?;
        let offset = u32::try_from(out.len())
            .map_err(|_| BlattwerkError::Archive("archive exceeds 4 GiB".to_string()))?;
        let crc = crc32(&entry.data);

        put_u32(&mut out, LOCAL_HEADER_SIGNATURE);
        put_u16(&mut out, VERSION_NEEDED);
        put_u16(&mut out, FLAG_UTF8);
        put_u16(&mut out, METHOD_STORED);
        put_u16(&mut out, dos_time);
        put_u16(&mut out, dos_date);
        put_u32(&mut out, crc);
        put_u32(&mut out, size); // compressed
        put_u32(&mut out, size); // uncompressed
        put_u16(&mut out, name_len);
        put_u16(&mut out, 0); // extra field
        out.extend_from_slice(name);
        out.extend_from_slice(&entry.data);

        put_u32(&mut central, CENTRAL_HEADER_SIGNATURE);
        put_u16(&mut central, VERSION_MADE_BY);
        put_u16(&mut central, VERSION_NEEDED);
        put_u16(&mut central, FLAG_UTF8);
        put_u16(&mut central, METHOD_STORED);
        put_u16(&mut central, dos_time);
        put_u16(&mut central, dos_date);
        put_u32(&mut central, crc);
        put_u32(&mut central, size);
        put_u32(&mut central, size);
        put_u16(&mut central, name_len);
        put_u16(&mut central, 0); // extra field
        put_u16(&mut central, 0); // comment
        put_u16(&mut central, 0); // disk number start
        put_u16(&mut central, 0); // internal attributes
        put_u32(&mut central, 0); // external attributes
        put_u32(&mut central, offset);
        central.extend_from_slice(name);
    }

    let central_offset = u32::try_from(out.len())
        .map_err(|_| BlattwerkError::Archive("archive exceeds 4 GiB".to_string()))?;
    let central_size = u32::try_from(central.len())
        .map_err(|_| BlattwerkError::Archive("central directory exceeds 4 GiB".to_string()))?;
    out.extend_from_slice(&central);

    let count = entries.len() as u16;
    put_u32(&mut out, END_OF_CENTRAL_DIRECTORY_SIGNATURE);
    put_u16(&mut out, 0); // this disk
    put_u16(&mut out, 0); // disk with central directory
    put_u16(&mut out, count);
    put_u16(&mut out, count);
    put_u32(&mut out, central_size);
    put_u32(&mut out, central_offset);
    put_u16(&mut out, 0); // comment length

    debug!(bytes = out.len(), "Archive encoded");
    Ok(out)
}

// -- Helpers --------------------------------------------------------------------

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// MS-DOS (time, date). Years before 1980 clamp to 1980-01-01 00:00:00;
/// seconds have two-second resolution.
fn dos_timestamp(at: NaiveDateTime) -> (u16, u16) {
    if at.year() < 1980 {
        return (0, (1 << 5) | 1);
    }
    let year = (at.year() - 1980).min(127) as u16;
    let time = ((at.hour() as u16) << 11) | ((at.minute() as u16) << 5) | (at.second() as u16 / 2);
    let date = (year << 9) | ((at.month() as u16) << 5) | at.day() as u16;
    (time, date)
}

const CRC32_TABLE: [u32; 256] = crc32_table();

const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                0xEDB8_8320 ^ (crc >> 1)
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// IEEE CRC-32 as used by ZIP.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc = CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8);
    }
    !crc
}
