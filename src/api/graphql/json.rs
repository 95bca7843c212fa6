//! JSON rendering honouring `graphql.json_encoding_options`.

use std::io;

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter, Serializer};
use serde_json::Value;

use crate::infrastructure::config::JsonEncodingOptions;

pub fn to_vec(value: &Value, options: &JsonEncodingOptions) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(128);
    if options.pretty_print {
        let formatter = EscapingFormatter::new(PrettyFormatter::new(), options);
        value.serialize(&mut Serializer::with_formatter(&mut out, formatter))?;
    } else {
        let formatter = EscapingFormatter::new(CompactFormatter, options);
        value.serialize(&mut Serializer::with_formatter(&mut out, formatter))?;
    }
    Ok(out)
}

/// Wraps a formatter, additionally escaping `/` and non-ASCII characters on request.
struct EscapingFormatter<F> {
    inner: F,
    escape_slashes: bool,
    escape_unicode: bool,
}

impl<F> EscapingFormatter<F> {
    fn new(inner: F, options: &JsonEncodingOptions) -> Self {
        Self {
            inner,
            escape_slashes: options.escape_slashes,
            escape_unicode: options.escape_unicode,
        }
    }

    fn needs_escape(&self, ch: char) -> bool {
        (self.escape_slashes && ch == '/') || (self.escape_unicode && !ch.is_ascii())
    }
}

impl<F: Formatter> Formatter for EscapingFormatter<F> {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        if !fragment.chars().any(|ch| self.needs_escape(ch)) {
            return self.inner.write_string_fragment(writer, fragment);
        }

        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if !self.needs_escape(ch) {
                continue;
            }
            if start < index {
                self.inner
                    .write_string_fragment(writer, &fragment[start..index])?;
            }
            if ch == '/' {
                writer.write_all(b"\\/")?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
            start = index + ch.len_utf8();
        }
        if start < fragment.len() {
            self.inner.write_string_fragment(writer, &fragment[start..])?;
        }
        Ok(())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}
