// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The binary wire codec.
//!
//! Stream layout: `[magic:4][version:1][endian:1][size-width:1]`, then a
//! sequence of records. Each record is a tag byte, the type key, an
//! optional inline type definition (written once per stream, on the
//! type's first use), a POD flag, a length-or-child-count word, and the
//! payload. Multi-byte words are native-endian; the header's endian byte
//! is what makes that safe to assume on read. POD payload bytes are
//! little-endian regardless (see [`crate::buffer`]).
//!
//! Readers resolve inline definitions *by name* against their own
//! registry, so wire keys never need to agree between writer and reader.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::any::Any;
use crate::error::Error;
use crate::record::Record;
use crate::resolver::type_registry::{TypeInfo, TypeRegistry};
use crate::serializer;
use crate::stream::StreamStatus;
use crate::types::{EndianMark, RecordTag, TypeKey, FORMAT_VERSION, MAGIC, NOTHING_KEY, SIZE_WIDTH};

fn map_eof(err: std::io::Error, eof: Error) -> Error {
    if err.kind() == ErrorKind::UnexpectedEof {
        eof
    } else {
        Error::Io(err)
    }
}

/// Binary record writer.
pub struct BinaryOStream<W: Write + Seek = BufWriter<File>> {
    sink: Option<W>,
    status: StreamStatus,
    defined: HashSet<TypeKey>,
    header_written: bool,
}

impl<W: Write + Seek> BinaryOStream<W> {
    /// Wraps an already-open sink. The header is emitted ahead of the
    /// first record.
    pub fn from_sink(sink: W) -> BinaryOStream<W> {
        BinaryOStream {
            sink: Some(sink),
            status: StreamStatus::empty(),
            defined: HashSet::new(),
            header_written: false,
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Serializes `value` and appends its record to the stream.
    pub fn write(&mut self, registry: &TypeRegistry, value: &Any) -> Result<(), Error> {
        let result = self.write_inner(registry, value);
        self.note(result)
    }

    fn write_inner(&mut self, registry: &TypeRegistry, value: &Any) -> Result<(), Error> {
        let sink = self.sink.as_mut().ok_or(Error::NotOpen)?;
        if !self.header_written {
            write_header(sink)?;
            self.header_written = true;
        }
        let record = serializer::serialize(registry, value)?;
        write_record(sink, registry, &mut self.defined, &record)
    }

    /// Repositions the underlying sink.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let result = match self.sink.as_mut() {
            Some(sink) => sink.seek(pos).map_err(Error::Io),
            None => Err(Error::NotOpen),
        };
        self.note(result)
    }

    pub fn seek_to_end(&mut self) -> Result<u64, Error> {
        self.seek(SeekFrom::End(0))
    }

    /// Consumes the stream, handing back the underlying sink without
    /// flushing it.
    pub fn into_inner(mut self) -> Option<W> {
        self.sink.take()
    }

    /// Flushes and releases the sink. Further operations fail until the
    /// stream is reopened.
    pub fn close(&mut self) -> Result<(), Error> {
        let result = match self.sink.take() {
            Some(mut sink) => sink.flush().map_err(Error::Io),
            None => Err(Error::NotOpen),
        };
        self.note(result)
    }

    fn note<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => self.status = StreamStatus::empty(),
            Err(err) => self.status |= StreamStatus::from_error(err),
        }
        result
    }
}

impl Default for BinaryOStream<BufWriter<File>> {
    fn default() -> Self {
        BinaryOStream {
            sink: None,
            status: StreamStatus::empty(),
            defined: HashSet::new(),
            header_written: false,
        }
    }
}

impl BinaryOStream<BufWriter<File>> {
    /// An unopened stream; every operation fails with `fail` status until
    /// [`BinaryOStream::open`] succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (truncating) `path` for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut stream = Self::new();
        stream.open(path, true)?;
        Ok(stream)
    }

    /// Opens `path` for appending; an existing non-empty file must carry
    /// a valid header, which is then not rewritten.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut stream = Self::new();
        stream.open(path, false)?;
        Ok(stream)
    }

    /// Opens `path`, truncating when `truncate` is set and appending
    /// otherwise.
    pub fn open<P: AsRef<Path>>(&mut self, path: P, truncate: bool) -> Result<(), Error> {
        let result = self.open_inner(path.as_ref(), truncate);
        self.note(result)
    }

    fn open_inner(&mut self, path: &Path, truncate: bool) -> Result<(), Error> {
        self.defined.clear();
        if truncate {
            let file = File::create(path)?;
            self.sink = Some(BufWriter::new(file));
            self.header_written = false;
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let len = file.seek(SeekFrom::End(0))?;
        if len == 0 {
            self.header_written = false;
        } else {
            file.seek(SeekFrom::Start(0))?;
            read_header(&mut file)?;
            file.seek(SeekFrom::End(0))?;
            // Keys defined by earlier sessions are unknown here; first
            // use in this session redefines them, which readers accept.
            self.header_written = true;
        }
        self.sink = Some(BufWriter::new(file));
        Ok(())
    }
}

fn write_header<W: Write>(sink: &mut W) -> Result<(), Error> {
    sink.write_all(&MAGIC)?;
    sink.write_u8(FORMAT_VERSION)?;
    sink.write_u8(EndianMark::native().into())?;
    sink.write_u8(SIZE_WIDTH)?;
    Ok(())
}

fn write_record<W: Write>(
    sink: &mut W,
    registry: &TypeRegistry,
    defined: &mut HashSet<TypeKey>,
    record: &Record,
) -> Result<(), Error> {
    let key = record.key();
    if key == NOTHING_KEY || defined.contains(&key) {
        sink.write_u8(RecordTag::Known.into())?;
        sink.write_u64::<NativeEndian>(key)?;
    } else {
        let info = registry
            .get_by_key(key)
            .ok_or_else(|| Error::unknown_type(format!("no type registered under key {key}")))?;
        let name = registry.checked_wire_name(&info)?;
        sink.write_u8(RecordTag::Define.into())?;
        sink.write_u64::<NativeEndian>(key)?;
        sink.write_u64::<NativeEndian>(name.len() as u64)?;
        sink.write_all(name.as_bytes())?;
        sink.write_u8(u8::from(info.is_pod()))?;
        sink.write_u64::<NativeEndian>(info.byte_len().map_or(u64::MAX, |l| l as u64))?;
        defined.insert(key);
    }
    match record {
        Record::Nothing => {
            sink.write_u8(1)?;
            sink.write_u64::<NativeEndian>(0)?;
        }
        Record::Pod { bytes, .. } => {
            sink.write_u8(1)?;
            sink.write_u64::<NativeEndian>(bytes.len() as u64)?;
            sink.write_all(bytes)?;
        }
        Record::Object { children, .. } => {
            sink.write_u8(0)?;
            sink.write_u64::<NativeEndian>(children.len() as u64)?;
            for child in children {
                write_record(sink, registry, defined, child)?;
            }
        }
    }
    Ok(())
}

/// Binary record reader.
pub struct BinaryIStream<R: Read + Seek = BufReader<File>> {
    source: Option<R>,
    status: StreamStatus,
    wire_types: HashMap<TypeKey, Arc<TypeInfo>>,
    header_checked: bool,
}

impl<R: Read + Seek> BinaryIStream<R> {
    /// Wraps an already-open source. The header is validated on the
    /// first read.
    pub fn from_source(source: R) -> BinaryIStream<R> {
        BinaryIStream {
            source: Some(source),
            status: StreamStatus::empty(),
            wire_types: HashMap::new(),
            header_checked: false,
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Reads and deserializes the next record. This is the
    /// error-returning entry point; the stream status reflects the same
    /// outcome afterwards.
    pub fn read(&mut self, registry: &TypeRegistry) -> Result<Any, Error> {
        let result = self.read_inner(registry);
        self.note(result)
    }

    fn read_inner(&mut self, registry: &TypeRegistry) -> Result<Any, Error> {
        let source = self.source.as_mut().ok_or(Error::NotOpen)?;
        if !self.header_checked {
            read_header(source)?;
            self.header_checked = true;
        }
        let record = read_record(source, registry, &mut self.wire_types, true)?;
        serializer::deserialize(registry, &record)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let result = match self.source.as_mut() {
            Some(source) => source.seek(pos).map_err(Error::Io),
            None => Err(Error::NotOpen),
        };
        self.note(result)
    }

    pub fn close(&mut self) -> Result<(), Error> {
        let result = match self.source.take() {
            Some(_) => Ok(()),
            None => Err(Error::NotOpen),
        };
        self.note(result)
    }

    fn note<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => self.status = StreamStatus::empty(),
            Err(err) => self.status |= StreamStatus::from_error(err),
        }
        result
    }
}

impl Default for BinaryIStream<BufReader<File>> {
    fn default() -> Self {
        BinaryIStream {
            source: None,
            status: StreamStatus::empty(),
            wire_types: HashMap::new(),
            header_checked: false,
        }
    }
}

impl BinaryIStream<BufReader<File>> {
    /// An unopened stream; every operation fails with `fail` status until
    /// [`BinaryIStream::open`] succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut stream = Self::new();
        stream.open(path)?;
        Ok(stream)
    }

    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let result = (|| {
            let file = File::open(path.as_ref())?;
            self.source = Some(BufReader::new(file));
            self.wire_types.clear();
            self.header_checked = false;
            Ok(())
        })();
        self.note(result)
    }
}

fn read_header<R: Read>(source: &mut R) -> Result<(), Error> {
    let mut magic = [0u8; 4];
    source
        .read_exact(&mut magic)
        .map_err(|e| map_eof(e, Error::bad_marker("stream too short for header")))?;
    if magic != MAGIC {
        return Err(Error::bad_marker(format!(
            "expected {MAGIC:02x?}, found {magic:02x?}"
        )));
    }
    let version = source
        .read_u8()
        .map_err(|e| map_eof(e, Error::bad_marker("stream too short for header")))?;
    if version != FORMAT_VERSION {
        return Err(Error::version_mismatch(FORMAT_VERSION, version));
    }
    let endian = source
        .read_u8()
        .map_err(|e| map_eof(e, Error::bad_marker("stream too short for header")))?;
    match EndianMark::try_from(endian) {
        Ok(mark) if mark == EndianMark::native() => {}
        Ok(mark) => {
            return Err(Error::endian_flag(format!(
                "stream endianness {mark:?} does not match this platform"
            )));
        }
        Err(_) => {
            return Err(Error::endian_flag(format!(
                "invalid endian byte {endian:#04x}"
            )));
        }
    }
    let width = source
        .read_u8()
        .map_err(|e| map_eof(e, Error::bad_marker("stream too short for header")))?;
    if width != SIZE_WIDTH {
        return Err(Error::width_mismatch(SIZE_WIDTH, width));
    }
    Ok(())
}

fn read_record<R: Read>(
    source: &mut R,
    registry: &TypeRegistry,
    wire_types: &mut HashMap<TypeKey, Arc<TypeInfo>>,
    top_level: bool,
) -> Result<Record, Error> {
    let tag = match source.read_u8() {
        Ok(byte) => byte,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(if top_level {
                Error::Eof
            } else {
                Error::EofInContainer
            });
        }
        Err(e) => return Err(Error::Io(e)),
    };
    let tag = RecordTag::try_from(tag)
        .map_err(|_| Error::malformed(format!("unknown record tag {tag:#04x}")))?;
    let frame_eof = || {
        if tag == RecordTag::Define {
            Error::EofInTypeDef
        } else {
            Error::EofInPod
        }
    };
    let wire_key = source
        .read_u64::<NativeEndian>()
        .map_err(|e| map_eof(e, frame_eof()))?;

    let info = match tag {
        RecordTag::Define => {
            if wire_key == NOTHING_KEY {
                return Err(Error::malformed("reserved key 0 must not be redefined"));
            }
            let name_len = source
                .read_u64::<NativeEndian>()
                .map_err(|e| map_eof(e, Error::EofInTypeDef))?;
            let mut name = vec![0u8; name_len as usize];
            source
                .read_exact(&mut name)
                .map_err(|e| map_eof(e, Error::EofInTypeDef))?;
            let name = String::from_utf8(name)
                .map_err(|e| Error::malformed(format!("type name is not UTF-8: {e}")))?;
            let def_pod = source
                .read_u8()
                .map_err(|e| map_eof(e, Error::EofInTypeDef))?;
            let def_len = source
                .read_u64::<NativeEndian>()
                .map_err(|e| map_eof(e, Error::EofInTypeDef))?;

            let info = registry.get_by_name(&name)?;
            if info.is_pod() != (def_pod != 0) {
                return Err(Error::pod_flag_mismatch(name));
            }
            let local_len = info.byte_len().map_or(u64::MAX, |l| l as u64);
            if local_len != def_len {
                return Err(Error::pod_size_mismatch(
                    local_len as usize,
                    def_len as usize,
                ));
            }
            wire_types.insert(wire_key, info.clone());
            Some(info)
        }
        RecordTag::Known => {
            if wire_key == NOTHING_KEY {
                None
            } else {
                Some(wire_types.get(&wire_key).cloned().ok_or_else(|| {
                    Error::malformed(format!("type key {wire_key} used before definition"))
                })?)
            }
        }
    };

    let pod_flag = source.read_u8().map_err(|e| map_eof(e, Error::EofInPod))?;
    let len = source
        .read_u64::<NativeEndian>()
        .map_err(|e| map_eof(e, Error::EofInPod))?;

    let Some(info) = info else {
        if pod_flag != 1 || len != 0 {
            return Err(Error::malformed("malformed record for reserved key 0"));
        }
        return Ok(Record::Nothing);
    };

    if pod_flag == 1 {
        if !info.is_pod() {
            return Err(Error::pod_flag_mismatch(info.name().to_owned()));
        }
        if let Some(expected) = info.byte_len() {
            if len as usize != expected {
                return Err(Error::pod_size_mismatch(expected, len as usize));
            }
        }
        let mut bytes = vec![0u8; len as usize];
        source
            .read_exact(&mut bytes)
            .map_err(|e| map_eof(e, Error::EofInPod))?;
        Ok(Record::Pod {
            key: info.key(),
            bytes,
        })
    } else {
        if info.is_pod() {
            return Err(Error::pod_flag_mismatch(info.name().to_owned()));
        }
        let mut children = Vec::with_capacity(len as usize);
        for _ in 0..len {
            children.push(read_record(source, registry, wire_types, false)?);
        }
        Ok(Record::Object {
            key: info.key(),
            children,
        })
    }
}
