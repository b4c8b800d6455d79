use std::fmt::{self, Write};

use crate::{JsonArray, JsonObject, Number, Value};

/// Layout policy for serialized text. It never changes what is written,
/// only where the line breaks and indentation go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatting {
    /// One member or element per line, indented by this many spaces per level
    Indented(usize),
    /// Everything on one line, no spaces
    Compact,
}

impl Default for Formatting {
    fn default() -> Self {
        Formatting::Indented(2)
    }
}

/// Writes `value` as indented JSON, keeping object keys in stored order.
pub fn serialize(value: &Value) -> String {
    serialize_with(value, Formatting::default())
}

pub fn serialize_with(value: &Value, formatting: Formatting) -> String {
    let mut output = String::new();
    // writing into a String cannot fail
    let _ = Writer::new(&mut output, formatting).write_value(value);
    output
}

pub(crate) fn serialize_object_with(object: &JsonObject, formatting: Formatting) -> String {
    let mut output = String::new();
    let _ = Writer::new(&mut output, formatting).write_object(object);
    output
}

fn formatting_for(f: &fmt::Formatter<'_>) -> Formatting {
    if f.alternate() {
        Formatting::default()
    } else {
        Formatting::Compact
    }
}

/// `{}` prints compact JSON, `{:#}` prints it indented.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatting = formatting_for(f);
        Writer::new(f, formatting).write_value(self)
    }
}

impl fmt::Display for JsonObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatting = formatting_for(f);
        Writer::new(f, formatting).write_object(self)
    }
}

impl fmt::Display for JsonArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatting = formatting_for(f);
        Writer::new(f, formatting).write_array(self)
    }
}

/// Depth-first token writer.
struct Writer<'a, W: Write + ?Sized> {
    out: &'a mut W,
    formatting: Formatting,
    depth: usize,
}

impl<'a, W: Write + ?Sized> Writer<'a, W> {
    fn new(out: &'a mut W, formatting: Formatting) -> Self {
        Self {
            out,
            formatting,
            depth: 0,
        }
    }

    fn write_value(&mut self, value: &Value) -> fmt::Result {
        match value {
            Value::Null => self.out.write_str("null"),
            Value::Boolean(boolean) => write!(self.out, "{boolean}"),
            Value::Number(number) => self.write_number(number),
            Value::String(string) => write_escaped(&mut *self.out, string),
            Value::Array(array) => self.write_array(array),
            Value::Object(object) => self.write_object(object),
        }
    }

    fn write_number(&mut self, number: &Number) -> fmt::Result {
        match number {
            Number::Integer(integer) => write!(self.out, "{integer}"),
            Number::BigInteger(digits) => self.out.write_str(digits),
            // JSON has no spelling for NaN or the infinities
            Number::Float(float) if !float.is_finite() => self.out.write_str("null"),
            // Debug keeps a `.0` or exponent, so the value reads back as a float
            Number::Float(float) => write!(self.out, "{float:?}"),
        }
    }

    fn write_array(&mut self, array: &JsonArray) -> fmt::Result {
        if array.is_empty() {
            return self.out.write_str("[]");
        }
        self.out.write_char('[')?;
        self.depth += 1;
        for (index, element) in array.iter().enumerate() {
            if index > 0 {
                self.out.write_char(',')?;
            }
            self.write_newline()?;
            self.write_value(element)?;
        }
        self.depth -= 1;
        self.write_newline()?;
        self.out.write_char(']')
    }

    fn write_object(&mut self, object: &JsonObject) -> fmt::Result {
        if object.is_empty() {
            return self.out.write_str("{}");
        }
        self.out.write_char('{')?;
        self.depth += 1;
        for (index, (key, value)) in object.iter().enumerate() {
            if index > 0 {
                self.out.write_char(',')?;
            }
            self.write_newline()?;
            self.write_property_name(key)?;
            self.write_value(value)?;
        }
        self.depth -= 1;
        self.write_newline()?;
        self.out.write_char('}')
    }

    fn write_property_name(&mut self, key: &str) -> fmt::Result {
        write_escaped(&mut *self.out, key)?;
        match self.formatting {
            Formatting::Indented(_) => self.out.write_str(": "),
            Formatting::Compact => self.out.write_char(':'),
        }
    }

    fn write_newline(&mut self) -> fmt::Result {
        if let Formatting::Indented(width) = self.formatting {
            self.out.write_char('\n')?;
            for _ in 0..width * self.depth {
                self.out.write_char(' ')?;
            }
        }
        Ok(())
    }
}

fn write_escaped<W: Write + ?Sized>(out: &mut W, string: &str) -> fmt::Result {
    out.write_char('"')?;
    for ch in string.chars() {
        match ch {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            '\u{8}' => out.write_str("\\b")?,
            '\u{c}' => out.write_str("\\f")?,
            c if c < '\u{20}' => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}
