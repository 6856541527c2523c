//! Little-endian primitives shared by every binary block
//!
//! Strings are a u32 byte length followed by UTF-8. Blocks are a u64 byte
//! length followed by the payload, so readers can skip what they do not
//! understand.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::attributes::Tags;
use crate::core::{Error, Result};

/// Encoded size of a length-prefixed string
pub fn string_size(value: &str) -> u64 {
    4 + value.len() as u64
}

pub fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(value.len() as u32)?;
    writer.write_all(value.as_bytes())
}

pub fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::Format(format!("invalid UTF-8 string: {}", e)))
}

/// Encoded size of a string array (count + strings)
pub fn strings_size<'a, I: IntoIterator<Item = &'a str>>(values: I) -> u64 {
    4 + values.into_iter().map(string_size).sum::<u64>()
}

pub fn write_strings<'a, W: Write, I: IntoIterator<Item = &'a str>>(
    writer: &mut W,
    values: I,
) -> io::Result<()> {
    let values: Vec<&str> = values.into_iter().collect();
    writer.write_u32::<LittleEndian>(values.len() as u32)?;
    for value in values {
        write_string(writer, value)?;
    }
    Ok(())
}

pub fn read_strings<R: Read>(reader: &mut R) -> Result<Vec<String>> {
    let count = reader.read_u32::<LittleEndian>()? as usize;
    let mut values = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        values.push(read_string(reader)?);
    }
    Ok(values)
}

/// Encoded size of a tag list (count + key/value strings)
pub fn tags_size(tags: &Tags) -> u64 {
    4 + tags
        .iter()
        .map(|(k, v)| string_size(k) + string_size(v))
        .sum::<u64>()
}

pub fn write_tags<W: Write>(writer: &mut W, tags: &Tags) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(tags.len() as u32)?;
    for (k, v) in tags.iter() {
        write_string(writer, k)?;
        write_string(writer, v)?;
    }
    Ok(())
}

pub fn read_tags<R: Read>(reader: &mut R) -> Result<Tags> {
    let count = reader.read_u32::<LittleEndian>()? as usize;
    let mut tags = Tags::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        let key = read_string(reader)?;
        let value = read_string(reader)?;
        tags.add(key, value);
    }
    Ok(tags)
}

/// Write the u64 length prefix of a block whose payload follows
pub fn write_block_header<W: Write>(writer: &mut W, payload_size: u64) -> io::Result<()> {
    writer.write_u64::<LittleEndian>(payload_size)
}

/// Read one length-delimited block with `parse`
///
/// `parse` only sees the block's bytes. Whatever it leaves unread is
/// skipped, so newer writers may append fields older readers ignore.
pub fn read_block<R, T, F>(reader: &mut R, parse: F) -> Result<T>
where
    R: Read,
    F: FnOnce(&mut io::Take<&mut R>) -> Result<T>,
{
    let size = reader.read_u64::<LittleEndian>()?;
    let mut block = reader.take(size);
    let value = parse(&mut block)?;

    let remaining = block.limit();
    if remaining > 0 {
        let skipped = io::copy(&mut block, &mut io::sink())?;
        if skipped != remaining {
            return Err(Error::Format(format!(
                "block truncated: {} of {} trailing bytes present",
                skipped, remaining
            )));
        }
    }
    Ok(value)
}

/// Read exactly `len` raw bytes
pub fn read_bytes<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(1 << 24) as usize);
    let read = reader.take(len).read_to_end(&mut buf)?;
    if read as u64 != len {
        return Err(Error::Format(format!(
            "expected {} bytes, found {}",
            len, read
        )));
    }
    Ok(buf)
}
