//! Single-line delimited-text parsing.
//!
//! Two modes over one line: count the fields, or populate a pre-allocated
//! field buffer. The grammar is deliberately small — fields split on a
//! single-byte separator, double-quote enclosure with `""` as a literal
//! quote, trailing CR/LF stripped. The parser assigns no meaning to any
//! field; header detection and numeric conversion belong to the converter.

use thiserror::Error;

/// Parse failures for a single line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DelimError {
    #[error("line contains an unclosed quote")]
    UnclosedQuote,

    #[error("line has more fields than the supplied buffer ({capacity} slots)")]
    TooManyFields { capacity: usize },
}

/// Strip one trailing `\n`, `\r\n`, or any run of CR/LF bytes.
fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Parse `line`, writing each field into successive slots of `fields`.
/// Returns the number of fields found. An empty line (after stripping the
/// line ending) yields zero fields and leaves `fields` untouched.
///
/// Slots beyond the returned count keep whatever they previously held.
pub fn parse_line(
    line: &str,
    separator: u8,
    fields: &mut [String],
) -> Result<usize, DelimError> {
    let line = strip_line_ending(line);
    if line.is_empty() {
        return Ok(0);
    }
    if fields.is_empty() {
        return Err(DelimError::TooManyFields { capacity: 0 });
    }

    let separator = separator as char;
    let mut in_quote = false;
    let mut count = 0usize;
    fields[0].clear();

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if !in_quote {
                in_quote = true;
            } else if chars.peek() == Some(&'"') {
                // Escaped quote inside a quoted field.
                fields[count].push('"');
                chars.next();
            } else {
                in_quote = false;
            }
        } else if c == separator && !in_quote {
            count += 1;
            if count >= fields.len() {
                return Err(DelimError::TooManyFields {
                    capacity: fields.len(),
                });
            }
            fields[count].clear();
        } else {
            fields[count].push(c);
        }
    }

    if in_quote {
        return Err(DelimError::UnclosedQuote);
    }

    // No separator follows the last field; count it here.
    Ok(count + 1)
}

/// Count the fields of `line` without materialising them.
pub fn count_fields(line: &str, separator: u8) -> Result<usize, DelimError> {
    let line = strip_line_ending(line);
    if line.is_empty() {
        return Ok(0);
    }

    let separator = separator as char;
    let mut in_quote = false;
    let mut count = 0usize;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if !in_quote {
                in_quote = true;
            } else if chars.peek() == Some(&'"') {
                chars.next();
            } else {
                in_quote = false;
            }
        } else if c == separator && !in_quote {
            count += 1;
        }
    }

    if in_quote {
        return Err(DelimError::UnclosedQuote);
    }

    Ok(count + 1)
}
