//! Placeholder substitution for query templates
//!
//! `{name}` is a placeholder, `{{` and `}}` are literal braces.

use std::collections::BTreeMap;

/// Failure to render a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A placeholder has no value
    Unbound(String),
    /// Unbalanced or empty braces
    Malformed(String),
}

/// Substitute every placeholder in `body` with its value
pub fn render(body: &str, values: &BTreeMap<String, String>) -> Result<String, FormatError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }

                let start = i + 1;
                let end = loop {
                    match chars.next() {
                        Some((j, '}')) => break j,
                        Some((j, '{')) => {
                            return Err(FormatError::Malformed(format!(
                                "unexpected '{{' inside placeholder at offset {j}"
                            )))
                        }
                        Some(_) => {}
                        None => {
                            return Err(FormatError::Malformed(format!(
                                "unclosed '{{' at offset {i}"
                            )))
                        }
                    }
                };

                let name = &body[start..end];
                if name.trim().is_empty() {
                    return Err(FormatError::Malformed(format!(
                        "empty placeholder at offset {i}"
                    )));
                }

                let value = values
                    .get(name)
                    .ok_or_else(|| FormatError::Unbound(name.to_string()))?;
                out.push_str(value);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(FormatError::Malformed(format!(
                        "single '}}' encountered at offset {i}"
                    )));
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
