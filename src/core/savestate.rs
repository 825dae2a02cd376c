//! Versioned savestate stream.
//!
//! A state is a magic tag and a format version followed by sections. Every
//! section starts with a four byte tag and holds fixed-width little-endian
//! fields in the order the owning component writes them.

use anyhow::{bail, ensure, Result};

const MAGIC: &[u8; 4] = b"ESRT";
pub const VERSION: u16 = 1;

pub struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&VERSION.to_le_bytes());
        Self { buf }
    }

    pub fn section(&mut self, tag: &[u8; 4]) {
        self.buf.extend_from_slice(tag);
    }

    pub fn var8(&mut self, val: u8) {
        self.buf.push(val);
    }

    pub fn var16(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn var32(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn var64(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn var_array(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for StateWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
    version: u16,
}

impl<'a> StateReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut reader = Self {
            data,
            pos: 0,
            version: 0,
        };

        let magic: [u8; 4] = reader.var_array()?;
        ensure!(&magic == MAGIC, "not a savestate (magic {magic:02x?})");

        reader.version = reader.var16()?;
        if reader.version == 0 || reader.version > VERSION {
            bail!("unsupported savestate version {}", reader.version);
        }

        Ok(reader)
    }

    pub const fn version(&self) -> u16 {
        self.version
    }

    pub fn section(&mut self, tag: &[u8; 4]) -> Result<()> {
        let found: [u8; 4] = self.var_array()?;
        ensure!(
            &found == tag,
            "expected section {:?}, found {:?}",
            String::from_utf8_lossy(tag),
            String::from_utf8_lossy(&found)
        );
        Ok(())
    }

    pub fn var8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn var16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.var_array()?))
    }

    pub fn var32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.var_array()?))
    }

    pub fn var64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.var_array()?))
    }

    pub fn var_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        if end > self.data.len() {
            bail!("savestate truncated at offset {} (wanted {len} bytes)", self.pos);
        }

        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}
