//! Extraction of named definitions from template files.
//!
//! A template file is a sequence of top-level definitions:
//!
//! ```jinja
//! {% block _card %}
//!   <div class="card">{{ title }}</div>
//! {% endblock %}
//!
//! this text is outside any definition and never rendered
//! ```
//!
//! Every top-level `{% block NAME %} ... {% endblock %}` pair becomes one
//! [`Definition`] whose body is compiled as its own template named `NAME`.
//! Blocks nested inside a definition stay part of the body and render in
//! place. Comments, expressions and `{% raw %}` regions are skipped so that
//! tag-like text inside them is never mistaken for a definition.
//!
//! Whitespace control on the definition tags applies to the extracted body:
//! `{% block x -%}` trims the start, `{%- endblock %}` trims the end.

use minijinja::{Error, ErrorKind};

/// One top-level definition found in a template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// The definition (entry point) name.
    pub name: String,
    /// Template source between the opening and closing tags.
    pub body: String,
    /// 1-based line of the opening tag.
    pub line: usize,
}

struct Open<'a> {
    name: &'a str,
    body_start: usize,
    trim_start: bool,
    line: usize,
}

/// Scans `source` and returns its top-level definitions in file order.
///
/// # Errors
///
/// Returns a minijinja [`ErrorKind::SyntaxError`] for unterminated tags or
/// comments, unbalanced `block`/`endblock` pairs and invalid block names.
pub fn scan(source: &str) -> Result<Vec<Definition>, Error> {
    let bytes = source.as_bytes();
    let mut definitions = Vec::new();
    let mut open: Option<Open<'_>> = None;
    let mut depth = 0usize;
    let mut pos = 0;

    while let Some(offset) = source[pos..].find('{') {
        let start = pos + offset;
        match bytes.get(start + 1) {
            Some(b'#') => {
                let end = source[start + 2..]
                    .find("#}")
                    .ok_or_else(|| syntax(source, start, "unterminated comment"))?;
                pos = start + 2 + end + 2;
            }
            Some(b'{') => {
                let end = find_close(source, start + 2, "}}")
                    .ok_or_else(|| syntax(source, start, "unterminated expression"))?;
                pos = end + 2;
            }
            Some(b'%') => {
                let end = find_close(source, start + 2, "%}")
                    .ok_or_else(|| syntax(source, start, "unterminated tag"))?;
                let tag = Tag::parse(&source[start + 2..end]);
                pos = end + 2;

                match tag.keyword {
                    "raw" => {
                        pos = skip_raw(source, pos)
                            .ok_or_else(|| syntax(source, start, "unterminated raw block"))?;
                    }
                    "block" => {
                        let name = tag
                            .argument
                            .ok_or_else(|| syntax(source, start, "block tag without a name"))?;
                        if !is_identifier(name) {
                            return Err(syntax(
                                source,
                                start,
                                &format!("invalid block name {:?}", name),
                            ));
                        }
                        if depth == 0 {
                            open = Some(Open {
                                name,
                                body_start: pos,
                                trim_start: tag.trim_after,
                                line: line_of(source, start),
                            });
                        }
                        depth += 1;
                    }
                    "endblock" => {
                        if depth == 0 {
                            return Err(syntax(source, start, "endblock without matching block"));
                        }
                        depth -= 1;
                        if depth == 0 {
                            if let Some(def) = open.take() {
                                let mut body = &source[def.body_start..start];
                                if def.trim_start {
                                    body = body.trim_start();
                                }
                                if tag.trim_before {
                                    body = body.trim_end();
                                }
                                definitions.push(Definition {
                                    name: def.name.to_string(),
                                    body: body.to_string(),
                                    line: def.line,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
            _ => pos = start + 1,
        }
    }

    if let Some(def) = open {
        return Err(Error::new(
            ErrorKind::SyntaxError,
            format!(
                "block {:?} opened on line {} is never closed",
                def.name, def.line
            ),
        ));
    }

    Ok(definitions)
}

/// The parts of a `{% ... %}` tag the scanner cares about.
struct Tag<'a> {
    keyword: &'a str,
    argument: Option<&'a str>,
    trim_before: bool,
    trim_after: bool,
}

impl<'a> Tag<'a> {
    fn parse(inner: &'a str) -> Self {
        let trim_before = inner.starts_with('-');
        let trim_after = inner.ends_with('-');
        let inner = inner
            .trim_start_matches(['-', '+'])
            .trim_end_matches(['-', '+'])
            .trim();
        let mut words = inner.split_whitespace();
        Tag {
            keyword: words.next().unwrap_or(""),
            argument: words.next(),
            trim_before,
            trim_after,
        }
    }
}

/// Finds `close` starting at `from`, skipping over quoted strings.
fn find_close(source: &str, from: usize, close: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'"' || b == b'\'' {
                    quote = Some(b);
                } else if source[i..].starts_with(close) {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

/// Returns the position just past the `{% endraw %}` tag following `from`.
fn skip_raw(source: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let start = pos + source[pos..].find("{%")?;
        let end = start + 2 + source[start + 2..].find("%}")?;
        pos = end + 2;
        if Tag::parse(&source[start + 2..end]).keyword == "endraw" {
            return Some(pos);
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

fn syntax(source: &str, offset: usize, msg: &str) -> Error {
    Error::new(
        ErrorKind::SyntaxError,
        format!("{} (line {})", msg, line_of(source, offset)),
    )
}
