//! Header line folding and RFC 2047 encoded words

use crate::encoder::{
    decode_all, encode_all, Base64Codec, LineBuffer, QuotedPrintableCodec, WordScheme, ENCODED_WORD_LINE_LEN,
};

const CHARSET: &str = "utf-8";
/// `=?utf-8?X?` plus `?=`
const WORD_OVERHEAD: usize = CHARSET.len() + 5 + 2;

fn is_wsp(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Printable ASCII, safe to write unencoded
fn is_plain(word: &str) -> bool {
    word.bytes().all(|b| (0x21..0x7F).contains(&b))
}

/// Splits a line into (leading whitespace, word, word offset) tokens
struct Tokens<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = (&'a str, &'a str, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.line[self.pos..];
        if rest.is_empty() {
            return None;
        }
        let word_start = rest.find(|c| !is_wsp(c)).unwrap_or(rest.len());
        let word_end = rest[word_start..]
            .find(is_wsp)
            .map_or(rest.len(), |i| word_start + i);
        let offset = self.pos + word_start;
        self.pos += word_end;
        Some((&rest[..word_start], &rest[word_start..word_end], offset))
    }
}

fn encoded_char_len(scheme: WordScheme, c: char) -> usize {
    match scheme {
        WordScheme::Base64 => c.len_utf8(),
        WordScheme::Q => {
            let mut buf = [0; 4];
            c.encode_utf8(&mut buf)
                .bytes()
                .map(|b| match b {
                    b'=' | b'?' | b'_' | 0..=0x1F | 0x7F..=0xFF => 3,
                    _ => 1,
                })
                .sum()
        }
    }
}

/// Longest prefix of `text` fitting in an encoded word of `room` payload columns
fn split_for_word(scheme: WordScheme, text: &str, room: usize) -> usize {
    let mut raw = 0;
    let mut end = 0;
    for (i, c) in text.char_indices() {
        let candidate = raw + encoded_char_len(scheme, c);
        let width = match scheme {
            WordScheme::Base64 => candidate.div_ceil(3) * 4,
            WordScheme::Q => candidate,
        };
        if width > room {
            break;
        }
        raw = candidate;
        end = i + c.len_utf8();
    }
    end
}

fn write_word(out: &mut LineBuffer, scheme: WordScheme, text: &str) {
    out.begin_encoded_word(CHARSET, scheme);
    match scheme {
        WordScheme::Base64 => encode_all(&mut Base64Codec::new(), text.as_bytes(), out),
        WordScheme::Q => encode_all(&mut QuotedPrintableCodec::encoded_word(), text.as_bytes(), out),
    };
    out.end_encoded_word();
}

/// Writes `text` as a sequence of encoded words, each holding whole characters
fn write_encoded(out: &mut LineBuffer, scheme: WordScheme, mut text: &str) {
    while !text.is_empty() {
        let room = ENCODED_WORD_LINE_LEN
            .saturating_sub(out.line_len())
            .saturating_sub(WORD_OVERHEAD);
        let mut end = split_for_word(scheme, text, room);
        if end == 0 {
            if out.line_len() > 1 {
                out.append(b"\r\n ");
                continue;
            }
            // Not even one character fits a fresh line, write it anyway
            end = text.chars().next().map_or(text.len(), char::len_utf8);
        }
        write_word(out, scheme, &text[..end]);
        text = &text[end..];
        if !text.is_empty() {
            out.append(b"\r\n ");
        }
    }
}

/// Encodes a display name as whitespace separated `B` encoded words
///
/// Names made of printable ASCII and spaces are returned as they are. Each
/// encoded word holds whole characters and fits a folded line on its own.
pub(crate) fn encode_phrase(text: &str) -> String {
    if text.bytes().all(|b| (0x20..0x7F).contains(&b)) {
        return text.to_owned();
    }

    let room = ENCODED_WORD_LINE_LEN - 1 - WORD_OVERHEAD;
    let mut words = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = match split_for_word(WordScheme::Base64, rest, room) {
            0 => rest.chars().next().map_or(rest.len(), char::len_utf8),
            end => end,
        };
        let mut out = LineBuffer::unfolded();
        write_word(&mut out, WordScheme::Base64, &rest[..end]);
        words.push(String::from_utf8_lossy(out.as_bytes()).into_owned());
        rest = &rest[end..];
    }
    words.join(" ")
}

/// Reverses [`encode_phrase`], for names made only of `utf-8` encoded words
///
/// Anything else, including words in other charsets, is returned unchanged.
pub(crate) fn decode_phrase(text: &str) -> String {
    let mut decoded = Vec::new();
    for word in text.split_ascii_whitespace() {
        let Some(bytes) = decode_word(word) else {
            return text.to_owned();
        };
        decoded.extend(bytes);
    }
    match String::from_utf8(decoded) {
        Ok(decoded) if !text.trim().is_empty() => decoded,
        _ => text.to_owned(),
    }
}

fn decode_word(word: &str) -> Option<Vec<u8>> {
    let inner = word.strip_prefix("=?")?.strip_suffix("?=")?;
    let mut parts = inner.splitn(3, '?');
    let (charset, scheme, payload) = (parts.next()?, parts.next()?, parts.next()?);
    if !charset.eq_ignore_ascii_case(CHARSET) {
        return None;
    }
    match scheme {
        "B" | "b" => decode_all(&mut Base64Codec::new(), payload.as_bytes()).ok(),
        "Q" | "q" => decode_all(&mut QuotedPrintableCodec::encoded_word(), payload.as_bytes()).ok(),
        _ => None,
    }
}

/// Writes one line of a header value, without its existing folds
fn write_line(out: &mut LineBuffer, scheme: WordScheme, line: &str) {
    let mut tokens = Tokens { line, pos: 0 }.peekable();
    let max = out.max_line_len();

    while let Some((space, word, start)) = tokens.next() {
        if word.is_empty() {
            out.append(space.as_bytes());
            continue;
        }

        if is_plain(word) {
            if !space.is_empty() && out.line_len() + space.len() + word.len() > max && out.line_len() > 1 {
                out.append_crlf();
            }
            out.append(space.as_bytes());
            out.append(word.as_bytes());
            continue;
        }

        // Whitespace between adjacent encoded words is dropped by decoders,
        // so a run of non-ASCII words is encoded as a single text
        let mut end = start + word.len();
        while let Some(&(_, next_word, next_start)) = tokens.peek() {
            if next_word.is_empty() || is_plain(next_word) {
                break;
            }
            end = next_start + next_word.len();
            tokens.next();
        }

        if !space.is_empty() && out.line_len() + space.len() + WORD_OVERHEAD + 4 > ENCODED_WORD_LINE_LEN {
            out.append_crlf();
        }
        out.append(space.as_bytes());
        write_encoded(out, scheme, &line[start..end]);
    }
}

/// Writes a complete `Name: value` CRLF header
///
/// Plain words are folded at whitespace before the line gets longer than the
/// buffer's maximum line length, folds already present in the value are kept.
/// Words containing anything but printable ASCII become encoded words, with
/// lines kept under [`ENCODED_WORD_LINE_LEN`] columns.
pub(crate) fn write_header(out: &mut LineBuffer, name: &str, value: &str, scheme: WordScheme) {
    out.append(name.as_bytes());
    out.append(b":");

    for (i, line) in value.split("\r\n").enumerate() {
        if i > 0 {
            out.append_crlf();
            if !line.starts_with(is_wsp) {
                out.append(b" ");
            }
        } else if !line.starts_with(is_wsp) {
            out.append(b" ");
        }
        write_line(out, scheme, line);
    }

    out.append_crlf();
}
