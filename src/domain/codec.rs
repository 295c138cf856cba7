//! Binary tag-length-value codec for the unit data model.
//!
//! The layout is wire compatible with the protobuf encoding of the same
//! messages: every field is prefixed by a varint tag `(field << 3) | wire_type`,
//! strings, byte payloads and sub-messages are varint-length-prefixed, and map
//! entries are length-prefixed sub-messages with the key in field 1 and the
//! value in field 2.
//!
//! Writing goes through `protobuf::CodedOutputStream`. Reading is done by the
//! [`Decoder`] below so that truncation (`UnexpectedEof`), corrupt varints
//! (`IntOverflow`) and impossible lengths (`InvalidLength`) stay
//! distinguishable for callers.
//!
//! Map fields are emitted sorted by key, so two logically equal values always
//! encode to identical bytes.

use protobuf::CodedOutputStream;

use crate::domain::unit::{Info, Key, Resolution, SourceUnit};

/// Errors raised while encoding or decoding binary messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of buffer")]
    UnexpectedEof,

    #[error("integer overflow: varint is longer than 64 bits")]
    IntOverflow,

    #[error("invalid length {0} found during decoding")]
    InvalidLength(u64),

    #[error("{message}: illegal tag {field} (wire type {wire_type})")]
    IllegalTag {
        message: &'static str,
        field: u64,
        wire_type: u8,
    },

    #[error("{message}: wrong wire type {wire_type} for field {field}")]
    WrongWireType {
        message: &'static str,
        field: &'static str,
        wire_type: u8,
    },

    #[error("illegal wire type {0}")]
    IllegalWireType(u8),

    #[error("{0}: wire type end group for non-group")]
    UnexpectedEndGroup(&'static str),

    #[error("end group for field {found} closes group {expected}")]
    MismatchedEndGroup { expected: u64, found: u64 },

    #[error("groups nested deeper than {0} levels")]
    RecursionLimitExceeded(usize),

    #[error("{message}: field {field} is not valid UTF-8")]
    InvalidUtf8 {
        message: &'static str,
        field: &'static str,
    },

    #[error("encoding failed: {0}")]
    Encode(#[from] protobuf::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Deepest nesting of unknown groups the decoder will skip.
pub const MAX_GROUP_DEPTH: usize = 100;

/// The low three bits of a field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = CodecError;

    fn try_from(value: u8) -> CodecResult<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(CodecError::IllegalWireType(other)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Decoder
// ═══════════════════════════════════════════════════════════════════════════

/// Cursor over an encoded message.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Reads a base-128 varint. At most ten bytes are accepted.
    pub fn read_varint(&mut self) -> CodecResult<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            if shift >= 64 {
                return Err(CodecError::IntOverflow);
            }
            let byte = *self.buf.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
            self.pos += 1;
            // The tenth byte only has room for bit 63.
            if shift == 63 && byte > 1 {
                return Err(CodecError::IntOverflow);
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte < 0x80 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Reads a field tag, rejecting field number zero and stray end-group markers.
    pub fn read_tag(&mut self, message: &'static str) -> CodecResult<(u32, WireType)> {
        let wire = self.read_varint()?;
        let raw_type = (wire & 0x7) as u8;
        let field = wire >> 3;
        if raw_type == WireType::EndGroup as u8 {
            return Err(CodecError::UnexpectedEndGroup(message));
        }
        if field == 0 || field > i32::MAX as u64 {
            return Err(CodecError::IllegalTag {
                message,
                field,
                wire_type: raw_type,
            });
        }
        Ok((field as u32, WireType::try_from(raw_type)?))
    }

    /// Reads a varint length prefix and returns the bytes it covers.
    pub fn read_length_delimited(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_varint()?;
        if len > i64::MAX as u64 {
            return Err(CodecError::InvalidLength(len));
        }
        let len = usize::try_from(len).map_err(|_| CodecError::InvalidLength(len))?;
        let end = self
            .pos
            .checked_add(len)
            .ok_or(CodecError::InvalidLength(len as u64))?;
        if end > self.buf.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_string(&mut self, message: &'static str, field: &'static str) -> CodecResult<String> {
        let bytes = self.read_length_delimited()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { message, field })
    }

    /// Skips the value of field `field`, which this decoder does not know.
    pub fn skip_field(&mut self, field: u32, wire_type: WireType) -> CodecResult<()> {
        match wire_type {
            WireType::StartGroup => self.skip_group(u64::from(field)),
            other => self.skip_scalar(other),
        }
    }

    fn skip_scalar(&mut self, wire_type: WireType) -> CodecResult<()> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => self.advance(8)?,
            WireType::Fixed32 => self.advance(4)?,
            WireType::LengthDelimited => {
                self.read_length_delimited()?;
            }
            WireType::StartGroup | WireType::EndGroup => {}
        }
        Ok(())
    }

    /// Skips a group whose start tag has been read. Nested groups are tracked
    /// on an explicit stack; each end tag must name the innermost open group.
    fn skip_group(&mut self, field: u64) -> CodecResult<()> {
        let mut open = vec![field];
        while let Some(&innermost) = open.last() {
            let wire = self.read_varint()?;
            let inner_field = wire >> 3;
            match WireType::try_from((wire & 0x7) as u8)? {
                WireType::EndGroup => {
                    if inner_field != innermost {
                        return Err(CodecError::MismatchedEndGroup {
                            expected: innermost,
                            found: inner_field,
                        });
                    }
                    open.pop();
                }
                WireType::StartGroup => {
                    if open.len() >= MAX_GROUP_DEPTH {
                        return Err(CodecError::RecursionLimitExceeded(MAX_GROUP_DEPTH));
                    }
                    open.push(inner_field);
                }
                other => self.skip_scalar(other)?,
            }
        }
        Ok(())
    }

    fn advance(&mut self, n: usize) -> CodecResult<()> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(CodecError::UnexpectedEof);
        }
        self.pos = end;
        Ok(())
    }
}

fn expect_length_delimited(
    wire_type: WireType,
    message: &'static str,
    field: &'static str,
) -> CodecResult<()> {
    if wire_type != WireType::LengthDelimited {
        return Err(CodecError::WrongWireType {
            message,
            field,
            wire_type: wire_type as u8,
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Message trait
// ═══════════════════════════════════════════════════════════════════════════

/// A record with a binary encoding.
///
/// Implementors write their known fields and merge known fields back in;
/// `merge_from` takes care of tags and skipping unknown fields.
pub trait WireMessage: Default {
    /// Name used in decode error messages.
    const NAME: &'static str;

    fn write_fields(&self, os: &mut CodedOutputStream<'_>) -> CodecResult<()>;

    /// Consumes the value of `field`. Returns `Ok(false)` for unknown fields,
    /// which the caller then skips.
    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        dec: &mut Decoder<'_>,
    ) -> CodecResult<bool>;

    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut os = CodedOutputStream::vec(&mut buf);
            self.write_fields(&mut os)?;
            os.flush()?;
        }
        Ok(buf)
    }

    /// Merges an encoded message into `self`. Repeated fields append,
    /// singular fields overwrite, sub-messages merge.
    fn merge_from(&mut self, data: &[u8]) -> CodecResult<()> {
        let mut dec = Decoder::new(data);
        while !dec.is_empty() {
            let (field, wire_type) = dec.read_tag(Self::NAME)?;
            if !self.merge_field(field, wire_type, &mut dec)? {
                dec.skip_field(field, wire_type)?;
            }
        }
        Ok(())
    }

    fn decode(data: &[u8]) -> CodecResult<Self> {
        let mut msg = Self::default();
        msg.merge_from(data)?;
        Ok(msg)
    }
}

fn write_str(
    os: &mut CodedOutputStream<'_>,
    field: u32,
    value: &str,
) -> Result<(), protobuf::Error> {
    if value.is_empty() {
        return Ok(());
    }
    os.write_string(field, value)
}

fn write_message<M: WireMessage>(
    os: &mut CodedOutputStream<'_>,
    field: u32,
    msg: &M,
) -> CodecResult<()> {
    let bytes = msg.encode()?;
    os.write_bytes(field, &bytes)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit messages
// ═══════════════════════════════════════════════════════════════════════════

impl WireMessage for Key {
    const NAME: &'static str = "Key";

    fn write_fields(&self, os: &mut CodedOutputStream<'_>) -> CodecResult<()> {
        write_str(os, 1, &self.repo)?;
        write_str(os, 2, &self.commit_id)?;
        write_str(os, 3, &self.version)?;
        write_str(os, 4, &self.unit_type)?;
        write_str(os, 5, &self.name)?;
        Ok(())
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        dec: &mut Decoder<'_>,
    ) -> CodecResult<bool> {
        let (name, slot) = match field {
            1 => ("Repo", &mut self.repo),
            2 => ("CommitID", &mut self.commit_id),
            3 => ("Version", &mut self.version),
            4 => ("Type", &mut self.unit_type),
            5 => ("Name", &mut self.name),
            _ => return Ok(false),
        };
        expect_length_delimited(wire_type, Self::NAME, name)?;
        *slot = dec.read_string(Self::NAME, name)?;
        Ok(true)
    }
}

impl WireMessage for Info {
    const NAME: &'static str = "Info";

    fn write_fields(&self, os: &mut CodedOutputStream<'_>) -> CodecResult<()> {
        for file in &self.files {
            os.write_string(1, file)?;
        }
        write_str(os, 2, &self.dir)?;
        for dep in &self.dependencies {
            write_message(os, 3, dep)?;
        }
        // Present-but-empty data is written as a zero-length field.
        if let Some(data) = &self.data {
            os.write_bytes(4, data)?;
        }
        for (k, v) in &self.config {
            let entry = encode_map_entry(k, v.as_bytes())?;
            os.write_bytes(5, &entry)?;
        }
        for (k, v) in &self.ops {
            let entry = encode_map_entry(k, v)?;
            os.write_bytes(6, &entry)?;
        }
        Ok(())
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        dec: &mut Decoder<'_>,
    ) -> CodecResult<bool> {
        match field {
            1 => {
                expect_length_delimited(wire_type, Self::NAME, "Files")?;
                self.files.push(dec.read_string(Self::NAME, "Files")?);
            }
            2 => {
                expect_length_delimited(wire_type, Self::NAME, "Dir")?;
                self.dir = dec.read_string(Self::NAME, "Dir")?;
            }
            3 => {
                expect_length_delimited(wire_type, Self::NAME, "Dependencies")?;
                self.dependencies.push(Key::decode(dec.read_length_delimited()?)?);
            }
            4 => {
                expect_length_delimited(wire_type, Self::NAME, "Data")?;
                self.data = Some(dec.read_length_delimited()?.to_vec());
            }
            5 => {
                expect_length_delimited(wire_type, Self::NAME, "Config")?;
                let (k, v) = decode_map_entry(dec.read_length_delimited()?)?;
                let v = String::from_utf8(v).map_err(|_| CodecError::InvalidUtf8 {
                    message: Self::NAME,
                    field: "Config",
                })?;
                self.config.insert(k, v);
            }
            6 => {
                expect_length_delimited(wire_type, Self::NAME, "Ops")?;
                let (k, v) = decode_map_entry(dec.read_length_delimited()?)?;
                self.ops.insert(k, v);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl WireMessage for SourceUnit {
    const NAME: &'static str = "SourceUnit";

    fn write_fields(&self, os: &mut CodedOutputStream<'_>) -> CodecResult<()> {
        write_message(os, 1, &self.key)?;
        write_message(os, 2, &self.info)
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        dec: &mut Decoder<'_>,
    ) -> CodecResult<bool> {
        match field {
            1 => {
                expect_length_delimited(wire_type, Self::NAME, "Key")?;
                self.key.merge_from(dec.read_length_delimited()?)?;
            }
            2 => {
                expect_length_delimited(wire_type, Self::NAME, "Info")?;
                self.info.merge_from(dec.read_length_delimited()?)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl WireMessage for Resolution {
    const NAME: &'static str = "Resolution";

    fn write_fields(&self, os: &mut CodedOutputStream<'_>) -> CodecResult<()> {
        write_message(os, 1, &self.raw)?;
        write_message(os, 2, &self.resolved)
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        dec: &mut Decoder<'_>,
    ) -> CodecResult<bool> {
        match field {
            1 => {
                expect_length_delimited(wire_type, Self::NAME, "Raw")?;
                self.raw.merge_from(dec.read_length_delimited()?)?;
            }
            2 => {
                expect_length_delimited(wire_type, Self::NAME, "Resolved")?;
                self.resolved.merge_from(dec.read_length_delimited()?)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Map entries
// ═══════════════════════════════════════════════════════════════════════════

fn encode_map_entry(key: &str, value: &[u8]) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut os = CodedOutputStream::vec(&mut buf);
        os.write_string(1, key)?;
        os.write_bytes(2, value)?;
        os.flush()?;
    }
    Ok(buf)
}

/// Decodes a `{1: key, 2: value}` entry. Missing halves decode as empty.
fn decode_map_entry(data: &[u8]) -> CodecResult<(String, Vec<u8>)> {
    const ENTRY: &str = "MapEntry";
    let mut dec = Decoder::new(data);
    let mut key = String::new();
    let mut value = Vec::new();
    while !dec.is_empty() {
        let (field, wire_type) = dec.read_tag(ENTRY)?;
        match field {
            1 => {
                expect_length_delimited(wire_type, ENTRY, "key")?;
                key = dec.read_string(ENTRY, "key")?;
            }
            2 => {
                expect_length_delimited(wire_type, ENTRY, "value")?;
                value = dec.read_length_delimited()?.to_vec();
            }
            _ => dec.skip_field(field, wire_type)?,
        }
    }
    Ok((key, value))
}
