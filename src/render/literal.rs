use crate::language::ast::{LitKind, Literal};

pub fn render_literal(lit: &Literal) -> String {
    render_lit_kind(&lit.kind)
}

pub fn render_lit_kind(kind: &LitKind) -> String {
    match kind {
        LitKind::Int { value, suffix } => match suffix {
            Some(suffix) => format!("{value}{suffix}"),
            None => value.to_string(),
        },
        LitKind::Float(text) => text.clone(),
        LitKind::Bool(value) => value.to_string(),
        LitKind::Char(value) => char_literal(*value),
        LitKind::Byte(value) => format!("b'{}'", escape_byte(*value, '\'')),
        LitKind::Str(value) => str_literal(value),
        LitKind::ByteStr(bytes) => {
            let mut out = String::from("b\"");
            for byte in bytes {
                out.push_str(&escape_byte(*byte, '"'));
            }
            out.push('"');
            out
        }
    }
}

pub fn char_literal(value: char) -> String {
    format!("'{}'", escape_char(value, '\''))
}

pub fn str_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        out.push_str(&escape_char(c, '"'));
    }
    out.push('"');
    out
}

/// Escapes `c` for a literal delimited by `quote`. Only the delimiting quote is escaped.
pub fn escape_char(c: char, quote: char) -> String {
    match c {
        '\\' => "\\\\".into(),
        '\n' => "\\n".into(),
        '\r' => "\\r".into(),
        '\t' => "\\t".into(),
        '\0' => "\\0".into(),
        c if c == quote => format!("\\{c}"),
        c if c.is_control() => format!("\\u{{{:x}}}", c as u32),
        c => c.to_string(),
    }
}

pub fn escape_byte(byte: u8, quote: char) -> String {
    match byte {
        b'\\' => "\\\\".into(),
        b'\n' => "\\n".into(),
        b'\r' => "\\r".into(),
        b'\t' => "\\t".into(),
        0 => "\\0".into(),
        b if char::from(b) == quote => format!("\\{}", char::from(b)),
        0x20..=0x7e => char::from(byte).to_string(),
        _ => format!("\\x{byte:02x}"),
    }
}
