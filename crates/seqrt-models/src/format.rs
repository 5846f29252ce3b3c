//! Binary model container
//!
//! All integers are little-endian. Layout:
//!
//! ```text
//! magic            b"SQRT"
//! binary_version   u32                       (1..=CURRENT_BINARY_VERSION)
//! spec_name        u16 length + utf8         (binary_version >= 2)
//! spec_revision    u32                       (binary_version >= 2)
//! num_variables    u32
//!   name           u16 length + utf8
//!   rank           u8
//!   dims           u32 * rank
//!   dtype          u8 id                     (binary_version >= 4)
//!   item_width     u8: 4 f32, 2 i16, 1 i8    (binary_version < 4)
//!   num_bytes      u32
//!   data           num_bytes
//! num_aliases      u32                       (binary_version >= 3)
//!   alias          u16 length + utf8
//!   target         u16 length + utf8
//! ```
//!
//! Version 1 containers carry no spec name and are read as
//! `TransformerSpec` revision 1.

use crate::storage::Variable;
use seqrt_common::{DataType, ModelError, Result, RevisionKind, SeqrtError};
use std::path::Path;

pub const MAGIC: &[u8; 4] = b"SQRT";

/// Newest container layout this build reads and writes.
pub const CURRENT_BINARY_VERSION: u32 = 4;

/// Spec name implied by version 1 containers.
pub const LEGACY_SPEC_NAME: &str = "TransformerSpec";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub binary_version: u32,
    pub spec_name: String,
    pub spec_revision: u32,
}

/// A variable record pointing into the container bytes.
#[derive(Debug, Clone)]
pub struct RawVariable<'a> {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DataType,
    pub data: &'a [u8],
}

impl RawVariable<'_> {
    pub fn to_variable(&self) -> Result<Variable> {
        let data = crate::storage::StorageData::from_le_bytes(self.dtype, self.data)?;
        Variable::new(self.shape.clone(), data)
    }
}

#[derive(Debug, Clone)]
pub struct Container<'a> {
    pub header: Header,
    pub variables: Vec<RawVariable<'a>>,
    pub aliases: Vec<(String, String)>,
}

// -----------------------------------------------------------------------------
// Reading
// -----------------------------------------------------------------------------

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|&end| end <= self.bytes.len()).ok_or_else(|| {
            SeqrtError::format(format!(
                "truncated container: {what} needs {len} bytes at offset {}, {} available",
                self.offset,
                self.bytes.len().saturating_sub(self.offset)
            ))
        })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let bytes = self.take(N, what)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn string(&mut self, what: &str) -> Result<String> {
        let len = self.u16(what)? as usize;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| SeqrtError::format(format!("{what} is not valid UTF-8")))
    }
}

fn read_header(reader: &mut ByteReader<'_>) -> Result<Header> {
    let magic = reader.array::<4>("magic")?;
    if &magic != MAGIC {
        return Err(SeqrtError::format(format!("bad magic {magic:02x?}, expected {MAGIC:02x?}")));
    }

    let binary_version = reader.u32("binary version")?;
    if binary_version == 0 {
        return Err(SeqrtError::format("binary version 0 is invalid"));
    }
    if binary_version > CURRENT_BINARY_VERSION {
        return Err(ModelError::UnsupportedRevision {
            kind: RevisionKind::Binary,
            found: binary_version,
            max: CURRENT_BINARY_VERSION,
        }
        .into());
    }

    let (spec_name, spec_revision) = if binary_version >= 2 {
        (reader.string("spec name")?, reader.u32("spec revision")?)
    } else {
        (LEGACY_SPEC_NAME.to_string(), 1)
    };
    Ok(Header { binary_version, spec_name, spec_revision })
}

fn dtype_from_item_width(width: u8) -> Result<DataType> {
    match width {
        4 => Ok(DataType::Float32),
        2 => Ok(DataType::Int16),
        1 => Ok(DataType::Int8),
        other => Err(SeqrtError::format(format!("unsupported item width {other}"))),
    }
}

fn read_variable<'a>(reader: &mut ByteReader<'a>, binary_version: u32) -> Result<RawVariable<'a>> {
    let name = reader.string("variable name")?;
    let rank = reader.u8("variable rank")?;
    let shape = (0..rank)
        .map(|_| reader.u32("variable dimension").map(|d| d as usize))
        .collect::<Result<Vec<_>>>()?;

    let dtype = if binary_version >= 4 {
        let id = reader.u8("variable dtype")?;
        DataType::from_id(id)
            .ok_or_else(|| SeqrtError::format(format!("variable '{name}' has unknown dtype id {id}")))?
    } else {
        dtype_from_item_width(reader.u8("variable item width")?)?
    };

    let num_bytes = reader.u32("variable byte count")? as usize;
    let expected = shape
        .iter()
        .try_fold(dtype.size_in_bytes(), |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| SeqrtError::format(format!("variable '{name}' shape {shape:?} overflows")))?;
    if num_bytes != expected {
        return Err(SeqrtError::format(format!(
            "variable '{name}' declares {num_bytes} bytes, shape {shape:?} of {dtype} needs {expected}"
        )));
    }

    let data = reader.take(num_bytes, "variable data")?;
    Ok(RawVariable { name, shape, dtype, data })
}

/// Parses a whole container. Variable data is borrowed from `bytes`.
pub fn parse_container(bytes: &[u8]) -> Result<Container<'_>> {
    let mut reader = ByteReader::new(bytes);
    let header = read_header(&mut reader)?;

    let num_variables = reader.u32("variable count")?;
    let variables = (0..num_variables)
        .map(|_| read_variable(&mut reader, header.binary_version))
        .collect::<Result<Vec<_>>>()?;

    let aliases = if header.binary_version >= 3 {
        let num_aliases = reader.u32("alias count")?;
        (0..num_aliases)
            .map(|_| Ok((reader.string("alias name")?, reader.string("alias target")?)))
            .collect::<Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(Container { header, variables, aliases })
}

// -----------------------------------------------------------------------------
// Writing
// -----------------------------------------------------------------------------

/// In-memory description of a container to serialize.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    binary_version: u32,
    spec_name: String,
    spec_revision: u32,
    variables: Vec<(String, Variable)>,
    aliases: Vec<(String, String)>,
}

impl ContainerBuilder {
    pub fn new(spec_name: impl Into<String>, spec_revision: u32) -> Self {
        Self {
            binary_version: CURRENT_BINARY_VERSION,
            spec_name: spec_name.into(),
            spec_revision,
            variables: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Writes an older layout. Version 1 drops the spec name and revision.
    pub fn binary_version(mut self, version: u32) -> Self {
        self.binary_version = version;
        self
    }

    pub fn variable(mut self, name: impl Into<String>, variable: Variable) -> Self {
        self.variables.push((name.into(), variable));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.binary_version.to_le_bytes());
        if self.binary_version >= 2 {
            write_string(&mut out, &self.spec_name)?;
            out.extend_from_slice(&self.spec_revision.to_le_bytes());
        }

        write_len(&mut out, self.variables.len(), "variable count")?;
        for (name, variable) in &self.variables {
            write_string(&mut out, name)?;
            let rank = u8::try_from(variable.rank())
                .map_err(|_| SeqrtError::InvalidArgument(format!("'{name}' has too many dimensions")))?;
            out.push(rank);
            for &dim in variable.shape() {
                write_len(&mut out, dim, "dimension")?;
            }
            if self.binary_version >= 4 {
                out.push(variable.dtype().id());
            } else {
                out.push(item_width(variable.dtype())?);
            }
            let data = variable.data().to_le_bytes();
            write_len(&mut out, data.len(), "variable byte count")?;
            out.extend_from_slice(&data);
        }

        if self.binary_version >= 3 {
            write_len(&mut out, self.aliases.len(), "alias count")?;
            for (alias, target) in &self.aliases {
                write_string(&mut out, alias)?;
                write_string(&mut out, target)?;
            }
        } else if !self.aliases.is_empty() {
            return Err(SeqrtError::InvalidArgument(format!(
                "binary version {} cannot store aliases",
                self.binary_version
            )));
        }
        Ok(out)
    }
}

fn item_width(dtype: DataType) -> Result<u8> {
    match dtype {
        DataType::Float32 => Ok(4),
        DataType::Int16 => Ok(2),
        DataType::Int8 => Ok(1),
        other => Err(SeqrtError::InvalidArgument(format!(
            "{other} variables need binary version 4 or newer"
        ))),
    }
}

fn write_len(out: &mut Vec<u8>, len: usize, what: &str) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| SeqrtError::InvalidArgument(format!("{what} exceeds u32")))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn write_string(out: &mut Vec<u8>, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| SeqrtError::InvalidArgument(format!("string of {} bytes is too long", value.len())))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Serializes `container` to `path`.
pub fn write_container(path: &Path, container: &ContainerBuilder) -> Result<()> {
    std::fs::write(path, container.to_bytes()?)?;
    Ok(())
}
