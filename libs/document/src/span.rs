//! Block-level layer of the span model
//!
//! A structural scan of the whole document finds `$...$` and `$$...$$`
//! regions with byte-exact boundaries. Fenced code blocks, inline code
//! spans and HTML comments are skipped, and `\$` is a literal dollar.
//! Spans are recomputed on every pass and never stored.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Inline,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub region_kind: RegionKind,
    /// Offset of the opening delimiter.
    pub doc_start: usize,
    /// Offset just past the closing delimiter.
    pub doc_end: usize,
    pub content_start: usize,
    pub content_end: usize,
    /// 1-based line of the opening delimiter.
    pub line: usize,
    /// Unit requested by a `<!-- [unit] -->` comment after the region.
    pub display_unit: Option<String>,
}

impl Span {
    pub fn content<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.content_start..self.content_end]
    }

    /// Where the content starts, relative to the opening delimiter.
    pub fn content_offset(&self) -> usize {
        self.content_start - self.doc_start
    }
}

/// Line starts of a document, for turning byte offsets into positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(doc: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(doc.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// 1-based line of `pos`.
    pub fn line(&self, pos: usize) -> usize {
        match self.starts.binary_search(&pos) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// 1-based line and character column of `pos`.
    pub fn locate(&self, doc: &str, pos: usize) -> (usize, usize) {
        let line = self.line(pos);
        let start = self.starts[line - 1];
        let column = doc
            .get(start..pos)
            .map_or(pos.saturating_sub(start), |s| s.chars().count());
        (line, column + 1)
    }
}

/// Opening or closing code fence: the fence character and its run length.
fn fence_marker(line: &str) -> Option<(u8, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line.as_bytes()[indent..];
    let c = *rest.first()?;
    if c != b'`' && c != b'~' {
        return None;
    }
    let run = rest.iter().take_while(|&&b| b == c).count();
    (run >= 3).then_some((c, run))
}

fn line_end(doc: &str, from: usize) -> usize {
    doc[from..].find('\n').map_or(doc.len(), |i| from + i)
}

/// First unescaped occurrence of `delim` in `doc[from..limit]`.
fn find_closing(doc: &str, from: usize, limit: usize, delim: &str) -> Option<usize> {
    let bytes = doc.as_bytes();
    let mut i = from;
    while i < limit {
        match bytes[i] {
            b'\\' => i += 2,
            _ if bytes[i..limit].starts_with(delim.as_bytes()) => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// A `<!-- [unit] -->` comment following `end` on the same line.
fn display_unit_after(doc: &str, end: usize) -> Option<String> {
    let rest = &doc[end..line_end(doc, end)];
    let comment = rest.trim_start().strip_prefix("<!--")?;
    let inner = comment[..comment.find("-->")?].trim();
    let unit = inner.strip_prefix('[')?.strip_suffix(']')?.trim();
    (!unit.is_empty()).then(|| unit.to_string())
}

/// Finds all math regions, in document order.
pub fn find_regions(doc: &str) -> Vec<Span> {
    let bytes = doc.as_bytes();
    let index = LineIndex::new(doc);
    let mut spans = Vec::new();
    let mut fence: Option<(u8, usize)> = None;
    let mut i = 0;
    let mut at_line_start = true;

    while i < bytes.len() {
        if at_line_start {
            at_line_start = false;
            let end = line_end(doc, i);
            let line = &doc[i..end];
            let marker = fence_marker(line);
            let skip = match (fence, marker) {
                (None, Some(open)) => {
                    fence = Some(open);
                    true
                }
                (Some((c, n)), Some((mc, mn))) if c == mc && mn >= n => {
                    let after = line.trim_start_matches(' ').trim_start_matches(c as char);
                    if after.trim().is_empty() {
                        fence = None;
                    }
                    true
                }
                (Some(_), _) => true,
                (None, None) => false,
            };
            if skip {
                i = end + 1;
                at_line_start = true;
                continue;
            }
        }

        match bytes[i] {
            b'\n' => {
                i += 1;
                at_line_start = true;
            }
            b'\\' => i += if bytes.get(i + 1) == Some(&b'\n') { 1 } else { 2 },
            b'`' => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
                let ticks = &doc[i..i + run];
                let search_from = i + run;
                let paragraph_end = doc[search_from..]
                    .find("\n\n")
                    .map_or(doc.len(), |p| search_from + p);
                let close = doc[search_from..paragraph_end]
                    .match_indices(ticks)
                    .map(|(p, _)| search_from + p)
                    .find(|&p| bytes.get(p + run) != Some(&b'`') && bytes[p - 1] != b'`');
                i = match close {
                    Some(p) => p + run,
                    None => search_from,
                };
            }
            b'<' if doc[i..].starts_with("<!--") => {
                i = doc[i + 4..].find("-->").map_or(doc.len(), |p| i + 4 + p + 3);
            }
            b'$' => {
                let block = bytes.get(i + 1) == Some(&b'$');
                let (open, close, limit) = if block {
                    ("$$", "$$", doc.len())
                } else {
                    ("$", "$", line_end(doc, i))
                };
                let content_start = i + open.len();
                match find_closing(doc, content_start, limit, close) {
                    Some(content_end) if content_end > content_start => {
                        let doc_end = content_end + close.len();
                        spans.push(Span {
                            region_kind: if block {
                                RegionKind::Block
                            } else {
                                RegionKind::Inline
                            },
                            doc_start: i,
                            doc_end,
                            content_start,
                            content_end,
                            line: index.line(i),
                            display_unit: display_unit_after(doc, doc_end),
                        });
                        i = doc_end;
                    }
                    _ => i = content_start,
                }
            }
            _ => i += 1,
        }
    }
    spans
}

/// Replaces the content of `span` (delimiters are kept).
pub fn substitute(doc: &str, span: &Span, new_content: &str) -> String {
    let mut out = String::with_capacity(doc.len() + new_content.len());
    out.push_str(&doc[..span.content_start]);
    out.push_str(new_content);
    out.push_str(&doc[span.content_end..]);
    out
}
