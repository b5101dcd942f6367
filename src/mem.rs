//! LLR memory files and ground-truth bit files
//!
//! The memory format is one two's-complement value per line in uppercase hex,
//! zero padded to the number of nibbles the width needs, e.g. for 8 bits
//! `+127 -> 7F` and `-127 -> 81`. Bit files hold one `0` or `1` per line.

use crate::error::{InvalidConfigSnafu, IoSnafu, MemParseSnafu, Result, StreamSnafu};
use crate::fixed::FixedFormat;
use snafu::{ensure, ResultExt};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn nibbles(format: FixedFormat) -> usize {
    format.bit_width().div_ceil(4) as usize
}

/// Encode one value as hex; `value` must lie within `format`
pub fn to_hex(value: i32, format: FixedFormat) -> String {
    let mask = (1u32 << format.bit_width()) - 1;
    format!("{:0width$X}", value as u32 & mask, width = nibbles(format))
}

/// Decode one hex field, sign-extending from the format width
pub fn from_hex(field: &str, format: FixedFormat, line: usize) -> Result<i32> {
    let raw = u32::from_str_radix(field, 16).ok();
    let Some(raw) = raw else {
        return MemParseSnafu {
            line,
            reason: format!("'{}' is not hex", field),
        }
        .fail();
    };
    let width = format.bit_width();
    ensure!(
        raw >> width == 0,
        MemParseSnafu {
            line,
            reason: format!("{} does not fit in {} bits", field, width),
        }
    );
    let sign = 1u32 << (width - 1);
    Ok(if raw & sign != 0 {
        raw as i32 - (1i32 << width)
    } else {
        raw as i32
    })
}

pub fn write_llr_mem<W: Write>(mut writer: W, values: &[i32], format: FixedFormat) -> Result<()> {
    for &value in values {
        let s = format.saturate(value as i64);
        ensure!(
            !s.clamped,
            InvalidConfigSnafu {
                reason: format!("value {} does not fit in {} bits", value, format.bit_width()),
            }
        );
        writeln!(writer, "{}", to_hex(value, format)).context(StreamSnafu)?;
    }
    writer.flush().context(StreamSnafu)
}

pub fn read_llr_mem<R: BufRead>(reader: R, format: FixedFormat) -> Result<Vec<i32>> {
    let mut values = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context(StreamSnafu)?;
        let field = line.trim();
        if field.is_empty() || field.starts_with("//") {
            continue;
        }
        values.push(from_hex(field, format, i + 1)?);
    }
    Ok(values)
}

pub fn write_bits<W: Write, I: IntoIterator<Item = bool>>(mut writer: W, bits: I) -> Result<()> {
    for bit in bits {
        writeln!(writer, "{}", u8::from(bit)).context(StreamSnafu)?;
    }
    writer.flush().context(StreamSnafu)
}

pub fn read_bits<R: BufRead>(reader: R) -> Result<Vec<bool>> {
    let mut bits = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context(StreamSnafu)?;
        match line.trim() {
            "" => continue,
            "0" => bits.push(false),
            "1" => bits.push(true),
            other => {
                return MemParseSnafu {
                    line: i + 1,
                    reason: format!("'{}' is not a bit", other),
                }
                .fail()
            }
        }
    }
    Ok(bits)
}

pub fn load_llr_mem(path: impl AsRef<Path>, format: FixedFormat) -> Result<Vec<i32>> {
    let path = path.as_ref();
    let file = File::open(path).context(IoSnafu { path })?;
    read_llr_mem(BufReader::new(file), format)
}

pub fn save_llr_mem(path: impl AsRef<Path>, values: &[i32], format: FixedFormat) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).context(IoSnafu { path })?;
    write_llr_mem(BufWriter::new(file), values, format)
}

pub fn save_bits<I: IntoIterator<Item = bool>>(path: impl AsRef<Path>, bits: I) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).context(IoSnafu { path })?;
    write_bits(BufWriter::new(file), bits)
}
