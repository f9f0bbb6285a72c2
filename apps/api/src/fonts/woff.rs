//! WOFF and WOFF2 unwrapping. Both containers carry an ordinary sfnt; layout
//! only ever parses the sfnt.

use std::borrow::Cow;

use super::{FontError, FontFormat};

const WOFF_HEADER_LEN: usize = 44;
const WOFF2_HEADER_LEN: usize = 48;
const WOFF_ENTRY_LEN: usize = 20;
const SFNT_HEADER_LEN: usize = 12;
const SFNT_RECORD_LEN: usize = 16;

/// Returns sfnt bytes for `data`, decoding compressed containers.
pub fn to_sfnt(format: FontFormat, data: &[u8]) -> Result<Cow<'_, [u8]>, FontError> {
    match format {
        FontFormat::Ttf | FontFormat::Otf | FontFormat::Collection => Ok(Cow::Borrowed(data)),
        FontFormat::Woff => decode_woff(data).map(Cow::Owned),
        FontFormat::Woff2 => {
            if data.len() < WOFF2_HEADER_LEN || read_u32(data, 8)? as usize != data.len() {
                return Err(FontError::Parse("WOFF2 header length does not match the data".to_string()));
            }
            let mut input = data;
            woff2::convert_woff2_to_ttf(&mut input)
                .map(Cow::Owned)
                .map_err(|e| FontError::Parse(format!("WOFF2 decode failed: {e:?}")))
        }
        FontFormat::Unknown => Err(FontError::UnsupportedFormat(format)),
    }
}

fn read_u16(data: &[u8], at: usize) -> Result<u16, FontError> {
    data.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(truncated)
}

fn read_u32(data: &[u8], at: usize) -> Result<u32, FontError> {
    data.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(truncated)
}

fn truncated() -> FontError {
    FontError::Parse("WOFF data is truncated".to_string())
}

struct WoffTable<'a> {
    tag: [u8; 4],
    checksum: u32,
    data: Cow<'a, [u8]>,
}

/// Rebuilds the sfnt from a WOFF 1.0 file. Tables stored with a shorter
/// compressed length are zlib streams; the rest are copied as-is.
fn decode_woff(data: &[u8]) -> Result<Vec<u8>, FontError> {
    let flavor = read_u32(data, 4)?;
    let num_tables = read_u16(data, 12)?;

    let mut tables = Vec::with_capacity(num_tables as usize);
    for i in 0..num_tables as usize {
        let entry = WOFF_HEADER_LEN + i * WOFF_ENTRY_LEN;
        let tag_bytes = data.get(entry..entry + 4).ok_or_else(truncated)?;
        let tag = [tag_bytes[0], tag_bytes[1], tag_bytes[2], tag_bytes[3]];
        let offset = read_u32(data, entry + 4)? as usize;
        let comp_length = read_u32(data, entry + 8)? as usize;
        let orig_length = read_u32(data, entry + 12)? as usize;
        let checksum = read_u32(data, entry + 16)?;

        let stored = data.get(offset..offset + comp_length).ok_or_else(truncated)?;
        let table = if comp_length < orig_length {
            let inflated = miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(stored, orig_length)
                .map_err(|_| {
                    FontError::Parse(format!("WOFF table {} failed to inflate", String::from_utf8_lossy(&tag)))
                })?;
            if inflated.len() != orig_length {
                return Err(FontError::Parse(format!(
                    "WOFF table {} inflated to {} bytes, expected {orig_length}",
                    String::from_utf8_lossy(&tag),
                    inflated.len()
                )));
            }
            Cow::Owned(inflated)
        } else {
            Cow::Borrowed(stored)
        };
        tables.push(WoffTable { tag, checksum, data: table });
    }

    Ok(write_sfnt(flavor, &tables))
}

fn write_sfnt(flavor: u32, tables: &[WoffTable<'_>]) -> Vec<u8> {
    let num_tables = tables.len() as u32;
    let entry_selector = num_tables.checked_ilog2().unwrap_or(0);
    let search_range = (1u32 << entry_selector) * SFNT_RECORD_LEN as u32;
    let range_shift = (num_tables * SFNT_RECORD_LEN as u32).saturating_sub(search_range);

    let mut out = Vec::new();
    out.extend_from_slice(&flavor.to_be_bytes());
    for field in [num_tables, search_range, entry_selector, range_shift] {
        out.extend_from_slice(&(field as u16).to_be_bytes());
    }

    let mut offset = SFNT_HEADER_LEN + SFNT_RECORD_LEN * tables.len();
    for table in tables {
        out.extend_from_slice(&table.tag);
        out.extend_from_slice(&table.checksum.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
        offset += padded(table.data.len());
    }
    for table in tables {
        out.extend_from_slice(&table.data);
        out.resize(out.len() + padded(table.data.len()) - table.data.len(), 0);
    }
    out
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}
