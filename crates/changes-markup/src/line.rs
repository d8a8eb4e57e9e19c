use std::io::{self, BufRead};

/// One physical line of input with its terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    /// 1-based line number.
    pub number: usize,
}

pub fn read_lines<R: BufRead>(reader: &mut R) -> io::Result<Vec<SourceLine>> {
    let mut lines = Vec::new();
    let mut buffer = Vec::new();
    let mut number = 0usize;

    loop {
        buffer.clear();
        let bytes_read = reader.read_until(b'\n', &mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        number += 1;

        lines.push(SourceLine {
            text: strip_line_breaks(&decode_line(&buffer)),
            number,
        });
    }

    Ok(lines)
}

/// Decodes one raw line as UTF-8, or as ISO-8859-1 when it is not valid UTF-8.
fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!("line is not UTF-8, decoding as ISO-8859-1");
            bytes.iter().map(|&byte| char::from(byte)).collect()
        }
    }
}

/// Removes every newline and carriage return, not just the trailing ones.
pub fn strip_line_breaks(text: &str) -> String {
    text.chars().filter(|ch| *ch != '\n' && *ch != '\r').collect()
}
