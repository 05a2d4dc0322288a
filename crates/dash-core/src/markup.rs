//! Tolerant scanner for the HTML-like dashboard markup.
//!
//! This is not an HTML parser. It finds elements by name inside a byte
//! range, pairs open and close tags of the same name with a depth counter,
//! and reads attribute lists. Everything it reports uses absolute byte
//! offsets into the scanned document, so callers can slice, exclude ranges
//! and compute line/column positions without copying text around.

use std::fmt;
use std::ops::Range;
use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

// ─── Attributes ──────────────────────────────────────────────────────────

/// Attribute list of one open tag, in source order.
///
/// Lookup is case-sensitive. Call sites that accept several spellings ask
/// for them explicitly with [`Attrs::get_any`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs(Vec<(String, String)>);

impl Attrs {
    /// Read `name="v"`, `name='v'`, `name=v` and bare `name` pairs.
    /// Values have their character entities decoded.
    pub fn parse(src: &str) -> Self {
        let mut pairs = Vec::new();
        let mut rest = src;
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            match parse_attribute.parse_next(&mut rest) {
                Ok((name, value)) => {
                    pairs.push((name.to_string(), decode_entities(value.unwrap_or(""))));
                }
                Err(_) => {
                    // Stray quote or `=`: skip one character and resync.
                    let mut chars = rest.chars();
                    chars.next();
                    rest = chars.as_str();
                }
            }
        }
        Attrs(pairs)
    }

    /// Raw value of the first attribute called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First non-blank value among `names`, trimmed.
    pub fn get_any(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_attr_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'')
    })
    .parse_next(input)
}

fn parse_attr_value<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
        take_while(1.., |c: char| !c.is_whitespace() && c != '>'),
    ))
    .parse_next(input)
}

fn parse_attribute<'a>(input: &mut &'a str) -> ModalResult<(&'a str, Option<&'a str>)> {
    let name = parse_attr_name.parse_next(input)?;
    let checkpoint = *input;
    let _: Result<&str, winnow::error::ErrMode<ContextError>> = multispace0.parse_next(input);
    let value = opt(preceded(('=', multispace0), parse_attr_value)).parse_next(input)?;
    if value.is_none() {
        *input = checkpoint;
    }
    Ok((name, value))
}

// ─── Elements ────────────────────────────────────────────────────────────

/// A structural failure that abandons the whole parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte offset the failure is reported at.
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    /// An element whose close tag is missing.
    pub fn unclosed(element: &Element) -> Self {
        Self::new(
            element.start,
            format!("Unclosed <{0}> tag: expected </{0}>", element.name),
        )
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.offset)
    }
}

impl std::error::Error for SyntaxError {}

/// One element found by [`find_elements`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name as requested by the caller (lowercase).
    pub name: &'static str,
    /// Offset of the opening `<`.
    pub start: usize,
    /// Offset just past the open tag's `>`.
    pub open_end: usize,
    pub attrs: Attrs,
    /// Content between the open and close tags. `None` for self-closing or
    /// unclosed elements.
    pub inner: Option<Range<usize>>,
    /// Offset just past the whole element.
    pub end: usize,
    pub self_closing: bool,
    /// `false` when no matching close tag was found.
    pub closed: bool,
}

impl Element {
    pub fn inner_str<'a>(&self, src: &'a str) -> &'a str {
        match &self.inner {
            Some(range) => &src[range.clone()],
            None => "",
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Find every outermost element named in `names` within `range`, in
/// document order. Comments are skipped. Nested same-name elements are
/// folded into their parent, and scanning resumes after each match.
///
/// Fails only when an open tag has no terminating `>`. Unclosed elements
/// are reported with `closed == false`; the caller decides whether that is
/// fatal.
pub fn find_elements(
    src: &str,
    range: Range<usize>,
    names: &[&'static str],
) -> Result<Vec<Element>, SyntaxError> {
    let limit = range.end.min(src.len());
    let mut out = Vec::new();
    let mut pos = range.start;

    while pos < limit {
        let Some(rel) = src[pos..limit].find('<') else {
            break;
        };
        let at = pos + rel;
        let here = &src[at..limit];

        if here.starts_with("<!--") {
            pos = skip_comment(src, at, limit);
            continue;
        }
        let Some(name) = names.iter().copied().find(|n| is_open_tag(here, n)) else {
            pos = at + 1;
            continue;
        };

        let tag = read_open_tag(src, at, name, limit)?;
        let element = if tag.self_closing {
            Element {
                name,
                start: at,
                open_end: tag.open_end,
                attrs: tag.attrs,
                inner: None,
                end: tag.open_end,
                self_closing: true,
                closed: true,
            }
        } else {
            match find_close(src, name, tag.open_end, limit)? {
                Some((close_start, close_end)) => Element {
                    name,
                    start: at,
                    open_end: tag.open_end,
                    attrs: tag.attrs,
                    inner: Some(tag.open_end..close_start),
                    end: close_end,
                    self_closing: false,
                    closed: true,
                },
                None => Element {
                    name,
                    start: at,
                    open_end: tag.open_end,
                    attrs: tag.attrs,
                    inner: None,
                    end: tag.open_end,
                    self_closing: false,
                    closed: false,
                },
            }
        };
        pos = element.end;
        out.push(element);
    }

    Ok(out)
}

/// First element named `name` within `range`.
pub fn find_first(
    src: &str,
    range: Range<usize>,
    name: &'static str,
) -> Result<Option<Element>, SyntaxError> {
    Ok(find_elements(src, range, &[name])?.into_iter().next())
}

struct OpenTag {
    attrs: Attrs,
    open_end: usize,
    self_closing: bool,
}

fn read_open_tag(
    src: &str,
    at: usize,
    name: &str,
    limit: usize,
) -> Result<OpenTag, SyntaxError> {
    let attrs_start = at + 1 + name.len();
    let mut quote: Option<u8> = None;
    let bytes = src.as_bytes();
    let mut i = attrs_start;
    while i < limit {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => {
                let raw = src[attrs_start..i].trim_end();
                let (raw, self_closing) = match raw.strip_suffix('/') {
                    Some(stripped) => (stripped, true),
                    None => (raw, false),
                };
                return Ok(OpenTag {
                    attrs: Attrs::parse(raw),
                    open_end: i + 1,
                    self_closing,
                });
            }
            None => {}
        }
        i += 1;
    }
    Err(SyntaxError::new(
        at,
        format!("Unterminated <{name}> tag: missing '>'"),
    ))
}

/// Locate the close tag matching an open `name` whose content starts at
/// `from`. Returns `(close_start, close_end)`.
fn find_close(
    src: &str,
    name: &str,
    from: usize,
    limit: usize,
) -> Result<Option<(usize, usize)>, SyntaxError> {
    let mut depth = 1usize;
    let mut pos = from;
    while pos < limit {
        let Some(rel) = src[pos..limit].find('<') else {
            return Ok(None);
        };
        let at = pos + rel;
        let here = &src[at..limit];
        if here.starts_with("<!--") {
            pos = skip_comment(src, at, limit);
        } else if is_close_tag(here, name) {
            depth -= 1;
            let close_end = here.find('>').map_or(limit, |gt| at + gt + 1);
            if depth == 0 {
                return Ok(Some((at, close_end)));
            }
            pos = close_end;
        } else if is_open_tag(here, name) {
            let tag = read_open_tag(src, at, name, limit)?;
            if !tag.self_closing {
                depth += 1;
            }
            pos = tag.open_end;
        } else {
            pos = at + 1;
        }
    }
    Ok(None)
}

fn skip_comment(src: &str, at: usize, limit: usize) -> usize {
    match src[at + 4..limit].find("-->") {
        Some(rel) => at + 4 + rel + 3,
        None => limit,
    }
}

fn is_tag_boundary(b: Option<&u8>) -> bool {
    match b {
        None => true,
        Some(b) => b.is_ascii_whitespace() || *b == b'>' || *b == b'/',
    }
}

/// `<name` followed by whitespace, `>`, `/` or end of input.
fn is_open_tag(s: &str, name: &str) -> bool {
    let bytes = s.as_bytes();
    let n = name.len();
    bytes.len() > n
        && bytes[0] == b'<'
        && bytes[1..=n].eq_ignore_ascii_case(name.as_bytes())
        && is_tag_boundary(bytes.get(n + 1))
}

fn is_close_tag(s: &str, name: &str) -> bool {
    let bytes = s.as_bytes();
    let n = name.len();
    bytes.len() > n + 1
        && bytes.starts_with(b"</")
        && bytes[2..n + 2].eq_ignore_ascii_case(name.as_bytes())
        && is_tag_boundary(bytes.get(n + 2))
}

// ─── Text helpers ────────────────────────────────────────────────────────

/// Decode the character entities the DSL writer produces.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    const ENTITIES: [(&str, char); 7] = [
        ("&quot;", '"'),
        ("&#34;", '"'),
        ("&#39;", '\''),
        ("&apos;", '\''),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&amp;", '&'),
    ];
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match ENTITIES.iter().find(|(e, _)| rest.starts_with(e)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape a value for use inside a double-quoted attribute.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

/// Visible text of a fragment: tags stripped, entities decoded and
/// whitespace runs collapsed to single spaces.
pub fn text_content(s: &str) -> String {
    let mut text = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 1-based (line, column) of a byte offset. Columns count characters.
pub fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Subtract `holes` (sorted, non-overlapping) from `range`.
pub fn exclude_ranges(range: Range<usize>, holes: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut cursor = range.start;
    for hole in holes {
        if hole.end <= cursor || hole.start >= range.end {
            continue;
        }
        if hole.start > cursor {
            out.push(cursor..hole.start);
        }
        cursor = cursor.max(hole.end);
    }
    if cursor < range.end {
        out.push(cursor..range.end);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(src: &str) -> Range<usize> {
        0..src.len()
    }

    #[test]
    fn attrs_quoting_styles() {
        let attrs = Attrs::parse(r#"id="a" title='Q1 sales' cols-d=3 hidden data-x = "y""#);
        assert_eq!(attrs.get("id"), Some("a"));
        assert_eq!(attrs.get("title"), Some("Q1 sales"));
        assert_eq!(attrs.get("cols-d"), Some("3"));
        assert_eq!(attrs.get("hidden"), Some(""));
        assert_eq!(attrs.get("data-x"), Some("y"));
    }

    #[test]
    fn attrs_decode_entities() {
        let attrs = Attrs::parse(r#"title="Tom &amp; &quot;Jerry&quot;""#);
        assert_eq!(attrs.get("title"), Some(r#"Tom & "Jerry""#));
    }

    #[test]
    fn attrs_lookup_is_case_sensitive() {
        let attrs = Attrs::parse(r#"borderColor="red""#);
        assert_eq!(attrs.get("bordercolor"), None);
        assert_eq!(attrs.get_any(&["border-color", "borderColor"]), Some("red"));
    }

    #[test]
    fn get_any_skips_blank_values() {
        let attrs = Attrs::parse(r#"span="" span-d="4""#);
        assert_eq!(attrs.get_any(&["span", "span-d"]), Some("4"));
    }

    #[test]
    fn boundary_check_distinguishes_prefixes() {
        let src = "<path d='x'/><p>hi</p>";
        let found = find_elements(src, all(src), &["p"]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].inner_str(src), "hi");
    }

    #[test]
    fn nested_same_name_pairs_by_depth() {
        let src = "<row id=a><row id=b></row></row><row id=c/>";
        let found = find_elements(src, all(src), &["row"]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].attrs.get("id"), Some("a"));
        assert_eq!(found[0].inner_str(src), "<row id=b></row>");
        assert!(found[1].self_closing);
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let src = r#"<kpi id="k" title="a > b"/>"#;
        let found = find_elements(src, all(src), &["kpi"]).unwrap();
        assert_eq!(found[0].attrs.get("title"), Some("a > b"));
        assert!(found[0].self_closing);
    }

    #[test]
    fn comments_are_skipped() {
        let src = "<!-- <kpi id=x/> --><KPI id=y/>";
        let found = find_elements(src, all(src), &["kpi"]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attrs.get("id"), Some("y"));
    }

    #[test]
    fn unclosed_element_is_flagged() {
        let src = "<row id=a><kpi id=k/>";
        let found = find_elements(src, all(src), &["row"]).unwrap();
        assert!(!found[0].closed);
        assert_eq!(found[0].inner, None);
    }

    #[test]
    fn missing_gt_is_an_error() {
        let src = "ab<row id=a";
        let err = find_elements(src, all(src), &["row"]).unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn text_content_strips_and_collapses() {
        assert_eq!(text_content("  <b>Sales</b>\n  &amp; <i>Ops</i> "), "Sales & Ops");
    }

    #[test]
    fn line_col_is_one_based() {
        let src = "ab\ncd";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 4), (2, 2));
    }

    #[test]
    fn exclude_ranges_splits() {
        assert_eq!(exclude_ranges(0..10, &[2..4, 6..7]), vec![0..2, 4..6, 7..10]);
        assert_eq!(exclude_ranges(0..10, &[]), vec![0..10]);
    }
}
