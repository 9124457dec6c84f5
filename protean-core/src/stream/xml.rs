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

//! The text/XML wire codec.
//!
//! ```xml
//! <SerialStream version="1" endian="e4">
//!   <Pod type="i32">42</Pod>
//!   <Object type="Vec&lt;f64&gt;">
//!     <Pod type="f64">1.5</Pod>
//!   </Object>
//!   <Pod type="u64" format="hex">2a00000000000000</Pod>
//! </SerialStream>
//! ```
//!
//! Pod payloads use the type's textual rendering when one is registered
//! and fall back to hex (`format="hex"`) for binary-safe round trips.
//! Types are referenced by wire name (`type`) or, for the reserved empty
//! value, by numeric key (`typeid="0"`).

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::any::Any;
use crate::error::Error;
use crate::record::Record;
use crate::resolver::type_registry::TypeRegistry;
use crate::serializer;
use crate::stream::{decode_hex, encode_hex, StreamStatus};
use crate::types::{EndianMark, TypeKey, FORMAT_VERSION, NOTHING_KEY};

const ROOT_TAG: &str = "SerialStream";
const CLOSE_TAG: &str = "</SerialStream>\n";

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// XML record writer.
pub struct XmlOStream<W: Write + Seek = File> {
    sink: Option<W>,
    status: StreamStatus,
    header_written: bool,
}

impl<W: Write + Seek> XmlOStream<W> {
    /// Wraps an already-open sink. The root element opens ahead of the
    /// first record; [`XmlOStream::close`] writes the closing tag.
    pub fn from_sink(sink: W) -> XmlOStream<W> {
        XmlOStream {
            sink: Some(sink),
            status: StreamStatus::empty(),
            header_written: false,
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Serializes `value` and appends its element under the root.
    pub fn write(&mut self, registry: &TypeRegistry, value: &Any) -> Result<(), Error> {
        let result = self.write_inner(registry, value);
        self.note(result)
    }

    fn write_inner(&mut self, registry: &TypeRegistry, value: &Any) -> Result<(), Error> {
        let sink = self.sink.as_mut().ok_or(Error::NotOpen)?;
        if !self.header_written {
            write!(
                sink,
                "<{ROOT_TAG} version=\"{FORMAT_VERSION}\" endian=\"{}\">\n",
                EndianMark::native().as_hex()
            )?;
            self.header_written = true;
        }
        let record = serializer::serialize(registry, value)?;
        emit(sink, registry, &record, 1)
    }

    /// Repositions the underlying sink at its end.
    pub fn seek_to_end(&mut self) -> Result<u64, Error> {
        let result = match self.sink.as_mut() {
            Some(sink) => sink.seek(SeekFrom::End(0)).map_err(Error::Io),
            None => Err(Error::NotOpen),
        };
        self.note(result)
    }

    /// Writes the closing root tag, flushes and releases the sink.
    pub fn close(&mut self) -> Result<(), Error> {
        let result = (|| match self.sink.take() {
            Some(mut sink) => {
                if !self.header_written {
                    write!(
                        sink,
                        "<{ROOT_TAG} version=\"{FORMAT_VERSION}\" endian=\"{}\">\n",
                        EndianMark::native().as_hex()
                    )?;
                    self.header_written = true;
                }
                sink.write_all(CLOSE_TAG.as_bytes())?;
                sink.flush()?;
                Ok(())
            }
            None => Err(Error::NotOpen),
        })();
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

impl<W: Write + Seek> Drop for XmlOStream<W> {
    /// Best-effort close so a dropped writer still leaves a well-formed
    /// document behind.
    fn drop(&mut self) {
        if self.sink.is_some() {
            let _ = self.close();
        }
    }
}

impl Default for XmlOStream<File> {
    fn default() -> Self {
        XmlOStream {
            sink: None,
            status: StreamStatus::empty(),
            header_written: false,
        }
    }
}

impl XmlOStream<File> {
    /// An unopened stream; every operation fails with `fail` status until
    /// [`XmlOStream::open`] succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (truncating) `path` for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut stream = Self::new();
        stream.open(path, true)?;
        Ok(stream)
    }

    /// Opens `path` for appending. The existing document's root, version
    /// and endianness are validated, then the closing tag is overwritten
    /// by the newly appended records.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut stream = Self::new();
        stream.open(path, false)?;
        Ok(stream)
    }

    pub fn open<P: AsRef<Path>>(&mut self, path: P, truncate: bool) -> Result<(), Error> {
        let result = self.open_inner(path.as_ref(), truncate);
        self.note(result)
    }

    fn open_inner(&mut self, path: &Path, truncate: bool) -> Result<(), Error> {
        if truncate {
            self.sink = Some(File::create(path)?);
            self.header_written = false;
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        if content.trim().is_empty() {
            file.seek(SeekFrom::Start(0))?;
            self.header_written = false;
        } else {
            validate_root(&content)?;
            let tail = content.rfind(CLOSE_TAG.trim_end()).ok_or_else(|| {
                Error::malformed("existing document has no closing SerialStream tag")
            })?;
            file.seek(SeekFrom::Start(tail as u64))?;
            self.header_written = true;
        }
        self.sink = Some(file);
        Ok(())
    }
}

fn emit<W: Write>(
    sink: &mut W,
    registry: &TypeRegistry,
    record: &Record,
    depth: usize,
) -> Result<(), Error> {
    let indent = "  ".repeat(depth);
    match record {
        Record::Nothing => {
            writeln!(sink, "{indent}<Pod typeid=\"0\"/>")?;
        }
        Record::Pod { key, bytes } => {
            let info = registry
                .get_by_key(*key)
                .ok_or_else(|| Error::unknown_type(format!("no type registered under key {key}")))?;
            let name = escape_xml(registry.checked_wire_name(&info)?);
            let harness = info.harness();
            // Textual payloads need a printable rendering that XML can
            // carry; anything else goes out as hex.
            let text = match (harness.pod_decode, harness.print) {
                (Some(decode), Some(print)) => {
                    let value = decode(bytes)?;
                    let text = print(value.as_ref())?;
                    let xml_safe = !text
                        .chars()
                        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t');
                    xml_safe.then_some(text)
                }
                _ => None,
            };
            match text {
                Some(text) => {
                    writeln!(sink, "{indent}<Pod type=\"{name}\">{}</Pod>", escape_xml(&text))?;
                }
                None => {
                    writeln!(
                        sink,
                        "{indent}<Pod type=\"{name}\" format=\"hex\">{}</Pod>",
                        encode_hex(bytes)
                    )?;
                }
            }
        }
        Record::Object { key, children } => {
            let info = registry
                .get_by_key(*key)
                .ok_or_else(|| Error::unknown_type(format!("no type registered under key {key}")))?;
            let name = escape_xml(registry.checked_wire_name(&info)?);
            writeln!(sink, "{indent}<Object type=\"{name}\">")?;
            for child in children {
                emit(sink, registry, child, depth + 1)?;
            }
            writeln!(sink, "{indent}</Object>")?;
        }
    }
    Ok(())
}

fn validate_root(content: &str) -> Result<(u8, EndianMark), Error> {
    let doc = roxmltree::Document::parse(content)?;
    let root = doc.root_element();
    if root.tag_name().name() != ROOT_TAG {
        return Err(Error::malformed(format!(
            "expected <{ROOT_TAG}> root element, found <{}>",
            root.tag_name().name()
        )));
    }
    let version = root
        .attribute("version")
        .ok_or_else(|| Error::malformed("root element is missing the version attribute"))?;
    let version: u8 = version
        .parse()
        .map_err(|_| Error::malformed(format!("invalid version attribute {version:?}")))?;
    if version != FORMAT_VERSION {
        return Err(Error::version_mismatch(FORMAT_VERSION, version));
    }
    let endian = root
        .attribute("endian")
        .ok_or_else(|| Error::malformed("root element is missing the endian attribute"))?;
    let mark = EndianMark::from_hex(endian)?;
    if mark != EndianMark::native() {
        return Err(Error::endian_flag(format!(
            "document endianness {mark:?} does not match this platform"
        )));
    }
    Ok((version, mark))
}

#[derive(Debug)]
enum TypeRef {
    Name(String),
    Key(TypeKey),
}

#[derive(Debug)]
enum Elem {
    Pod {
        type_ref: TypeRef,
        hex: bool,
        text: String,
    },
    Object {
        type_ref: TypeRef,
        children: Vec<Elem>,
    },
}

/// XML record reader. The whole document is parsed and validated at
/// open; records are resolved against the registry one at a time.
#[derive(Debug)]
pub struct XmlIStream {
    status: StreamStatus,
    pending: Option<VecDeque<Elem>>,
}

impl Default for XmlIStream {
    fn default() -> Self {
        XmlIStream {
            status: StreamStatus::empty(),
            pending: None,
        }
    }
}

impl XmlIStream {
    /// An unopened stream; every operation fails with `fail` status until
    /// a successful `open`/`from_str`.
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
            let content = std::fs::read_to_string(path.as_ref())?;
            self.pending = Some(parse_document(&content)?);
            Ok(())
        })();
        self.note(result)
    }

    /// Parses an in-memory document.
    pub fn from_str(content: &str) -> Result<Self, Error> {
        let mut stream = Self::new();
        let result = parse_document(content).map(|pending| stream.pending = Some(pending));
        stream.note(result)?;
        Ok(stream)
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Resolves and deserializes the next record. This is the
    /// error-returning entry point; the stream status reflects the same
    /// outcome afterwards.
    pub fn read(&mut self, registry: &TypeRegistry) -> Result<Any, Error> {
        let result = (|| {
            let pending = self.pending.as_mut().ok_or(Error::NotOpen)?;
            let elem = pending.pop_front().ok_or(Error::Eof)?;
            let record = resolve(registry, &elem)?;
            serializer::deserialize(registry, &record)
        })();
        self.note(result)
    }

    pub fn close(&mut self) -> Result<(), Error> {
        let result = match self.pending.take() {
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

fn parse_document(content: &str) -> Result<VecDeque<Elem>, Error> {
    validate_root(content)?;
    let doc = roxmltree::Document::parse(content)?;
    let root = doc.root_element();
    root.children()
        .filter(|node| node.is_element())
        .map(|node| convert_elem(&node))
        .collect()
}

fn convert_elem(node: &roxmltree::Node) -> Result<Elem, Error> {
    let type_ref = |node: &roxmltree::Node| -> Result<TypeRef, Error> {
        if let Some(name) = node.attribute("type") {
            return Ok(TypeRef::Name(name.to_owned()));
        }
        if let Some(id) = node.attribute("typeid") {
            let key: TypeKey = id
                .parse()
                .map_err(|_| Error::malformed(format!("invalid typeid attribute {id:?}")))?;
            return Ok(TypeRef::Key(key));
        }
        Err(Error::malformed(format!(
            "<{}> element is missing a type or typeid attribute",
            node.tag_name().name()
        )))
    };
    match node.tag_name().name() {
        "Pod" => {
            if node.children().any(|child| child.is_element()) {
                return Err(Error::malformed("sub-element nested inside a Pod element"));
            }
            let hex = match node.attribute("format") {
                None => false,
                Some("hex") => true,
                Some(other) => {
                    return Err(Error::malformed(format!(
                        "unknown Pod format attribute {other:?}"
                    )));
                }
            };
            Ok(Elem::Pod {
                type_ref: type_ref(node)?,
                hex,
                text: node.text().unwrap_or("").to_owned(),
            })
        }
        "Object" => {
            let children = node
                .children()
                .filter(|child| child.is_element())
                .map(|child| convert_elem(&child))
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(Elem::Object {
                type_ref: type_ref(node)?,
                children,
            })
        }
        other => Err(Error::malformed(format!(
            "unrecognized element <{other}> in serial stream"
        ))),
    }
}

fn resolve(registry: &TypeRegistry, elem: &Elem) -> Result<Record, Error> {
    match elem {
        Elem::Pod {
            type_ref,
            hex,
            text,
        } => {
            let info = match type_ref {
                TypeRef::Name(name) => registry.get_by_name(name)?,
                TypeRef::Key(key) => {
                    if *key == NOTHING_KEY {
                        if !text.trim().is_empty() {
                            return Err(Error::malformed(
                                "reserved key 0 must carry an empty payload",
                            ));
                        }
                        return Ok(Record::Nothing);
                    }
                    registry.get_by_key(*key).ok_or_else(|| {
                        Error::unknown_type(format!("no type registered under key {key}"))
                    })?
                }
            };
            if info.key() == NOTHING_KEY {
                if !text.trim().is_empty() {
                    return Err(Error::malformed(
                        "reserved key 0 must carry an empty payload",
                    ));
                }
                return Ok(Record::Nothing);
            }
            registry.checked_wire_name(&info)?;
            if !info.is_pod() {
                return Err(Error::pod_flag_mismatch(info.name().to_owned()));
            }
            let bytes = if *hex {
                decode_hex(text)?
            } else {
                let parse = info.harness().parse.ok_or_else(|| {
                    Error::parse_error(format!("no parser registered for {}", info.name()))
                })?;
                let encode = info.harness().pod_encode.ok_or_else(|| {
                    Error::unknown_type(format!(
                        "type {} has no registered serializer",
                        info.name()
                    ))
                })?;
                let value = parse(text)?;
                encode(value.as_ref())?
            };
            Ok(Record::Pod {
                key: info.key(),
                bytes,
            })
        }
        Elem::Object { type_ref, children } => {
            let info = match type_ref {
                TypeRef::Name(name) => registry.get_by_name(name)?,
                TypeRef::Key(key) => registry.get_by_key(*key).ok_or_else(|| {
                    Error::unknown_type(format!("no type registered under key {key}"))
                })?,
            };
            registry.checked_wire_name(&info)?;
            if info.is_pod() {
                return Err(Error::pod_flag_mismatch(info.name().to_owned()));
            }
            let children = children
                .iter()
                .map(|child| resolve(registry, child))
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(Record::Object {
                key: info.key(),
                children,
            })
        }
    }
}
