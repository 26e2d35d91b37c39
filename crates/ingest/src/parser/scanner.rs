//! Escape- and quote-aware tokenizer shared by the record parsers.
//!
//! A scan walks the input one code point at a time, tracking whether it is
//! inside a double-quoted region or directly after a backslash, and stops on
//! the first unquoted, unescaped section break (or structural terminator).
//! The emitted token optionally has its escape markers removed:
//!
//! - `a\,b` scanned with removal becomes `a,b`
//! - `\x41`, `\0`, `\u00e9` keep their marker so a later decoder can read them
//! - the escaped character itself is always retained
//!
//! Scanning never fails. An unterminated quote simply runs to end of input.

use std::borrow::Cow;
use std::ops::Range;

/// Escapes whose backslash is kept (hex, octal and unicode sequences).
const NAMED_ESCAPES: [char; 5] = ['x', 'X', '0', 'u', 'U'];

/// Structural terminators of an RFC 5424 SD-ELEMENT.
const SD_TERMINATORS: [char; 2] = [']', '\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Normal,
    InQuote,
    /// The previous code point was an unconsumed backslash.
    /// `quoted` records the state to resume once the escaped character is read.
    Escaping { quoted: bool },
}

impl ScanState {
    /// Feed one code point. Returns `None` when the scan must stop before `c`.
    pub fn next(self, c: char, policy: &ScanPolicy) -> Option<ScanState> {
        match self {
            ScanState::Escaping { quoted: true } => Some(ScanState::InQuote),
            ScanState::Escaping { quoted: false } => Some(ScanState::Normal),
            ScanState::InQuote => Some(match c {
                '"' => ScanState::Normal,
                '\\' => ScanState::Escaping { quoted: true },
                _ => ScanState::InQuote,
            }),
            ScanState::Normal => match c {
                '"' => Some(ScanState::InQuote),
                '\\' => Some(ScanState::Escaping { quoted: false }),
                c if policy.is_terminator(c) => None,
                c if policy.stop_on_break && c == policy.section_break => None,
                _ => Some(ScanState::Normal),
            },
        }
    }
}

/// How a single scan treats breaks and escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    pub section_break: char,
    /// Remove escape markers from the emitted token
    pub strip_escapes: bool,
    /// When false the section break is ordinary content and only a
    /// terminator (or end of input) ends the scan
    pub stop_on_break: bool,
    pub terminators: &'static [char],
    /// Input starting with a space is discarded whole
    pub reject_leading_space: bool,
}

impl ScanPolicy {
    /// Line protocol sections (tags, fields, timestamp). Escapes are left
    /// for the pair scan.
    pub const LINE_SECTION: ScanPolicy = ScanPolicy {
        section_break: ' ',
        strip_escapes: false,
        stop_on_break: true,
        terminators: &[],
        reject_leading_space: false,
    };

    /// Line protocol `key=value` pairs within a section.
    pub const LINE_PAIR: ScanPolicy = ScanPolicy {
        section_break: ',',
        strip_escapes: true,
        stop_on_break: true,
        terminators: &[],
        reject_leading_space: false,
    };

    /// One bracketed structured-data group, spaces included.
    pub const SD_GROUP: ScanPolicy = ScanPolicy {
        section_break: ' ',
        strip_escapes: false,
        stop_on_break: false,
        terminators: &SD_TERMINATORS,
        reject_leading_space: true,
    };

    /// `name="value"` parameters inside a structured-data group.
    pub const SD_PAIR: ScanPolicy = ScanPolicy {
        section_break: ' ',
        strip_escapes: true,
        stop_on_break: true,
        terminators: &SD_TERMINATORS,
        reject_leading_space: false,
    };

    #[inline]
    fn is_terminator(&self, c: char) -> bool {
        self.terminators.contains(&c)
    }
}

/// A scanned token: its byte range in the scanned input and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub span: Range<usize>,
    /// Borrowed unless escape markers were removed
    pub content: Cow<'a, str>,
}

impl<'a> Token<'a> {
    fn empty() -> Self {
        Self {
            span: 0..0,
            content: Cow::Borrowed(""),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn into_content(self) -> Cow<'a, str> {
        self.content
    }
}

/// Scan one token from the front of `input`.
///
/// Returns the number of bytes consumed and the token. When the scan stopped
/// on a break or terminator, `consumed` also covers that separator; at end of
/// input it equals the token span length.
pub fn scan<'a>(input: &'a str, policy: &ScanPolicy) -> (usize, Token<'a>) {
    if policy.reject_leading_space && input.starts_with(' ') {
        return (input.len(), Token::empty());
    }

    let mut state = ScanState::Normal;
    let mut markers: Vec<Range<usize>> = Vec::new();
    let mut marker = 0..0;
    let mut end = input.len();
    let mut consumed = input.len();

    for (idx, c) in input.char_indices() {
        if let ScanState::Escaping { .. } = state {
            if policy.strip_escapes && !NAMED_ESCAPES.contains(&c) {
                markers.push(marker.clone());
            }
        }

        match state.next(c, policy) {
            Some(next) => {
                if matches!(next, ScanState::Escaping { .. }) {
                    marker = idx..idx + c.len_utf8();
                }
                state = next;
            }
            None => {
                end = idx;
                consumed = idx + c.len_utf8();
                break;
            }
        }
    }

    let token = Token {
        span: 0..end,
        content: remove_ranges(&input[..end], &markers),
    };
    (consumed, token)
}

/// Copy `raw` into a fresh buffer, skipping the sorted, disjoint `ranges`.
fn remove_ranges<'a>(raw: &'a str, ranges: &[Range<usize>]) -> Cow<'a, str> {
    if ranges.is_empty() {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for range in ranges {
        debug_assert!(range.start >= last && range.end <= raw.len());
        out.push_str(&raw[last..range.start]);
        last = range.end;
    }
    out.push_str(&raw[last..]);
    Cow::Owned(out)
}

/// Repeated scans over one input, yielding tokens until it is exhausted.
///
/// Token spans are reported relative to the start of the whole input.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    policy: ScanPolicy,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str, policy: ScanPolicy) -> Self {
        Self {
            input,
            pos: 0,
            policy,
        }
    }

    /// Everything not consumed yet
    pub fn remainder(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Skip leading whitespace before the next scan.
    pub fn skip_whitespace(&mut self) {
        let rest = self.remainder();
        self.pos += rest.len() - rest.trim_start().len();
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }

        let start = self.pos;
        let (consumed, mut token) = scan(self.remainder(), &self.policy);
        self.pos = (start + consumed).min(self.input.len());
        token.span = start + token.span.start..start + token.span.end;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_str(input: &str, policy: ScanPolicy) -> (usize, String) {
        let (consumed, token) = scan(input, &policy);
        (consumed, token.content.into_owned())
    }

    #[test]
    fn test_state_transitions() {
        let policy = ScanPolicy::LINE_PAIR;

        assert_eq!(ScanState::Normal.next('a', &policy), Some(ScanState::Normal));
        assert_eq!(ScanState::Normal.next('"', &policy), Some(ScanState::InQuote));
        assert_eq!(
            ScanState::Normal.next('\\', &policy),
            Some(ScanState::Escaping { quoted: false })
        );
        assert_eq!(ScanState::Normal.next(',', &policy), None);

        assert_eq!(ScanState::InQuote.next(',', &policy), Some(ScanState::InQuote));
        assert_eq!(
            ScanState::InQuote.next('\\', &policy),
            Some(ScanState::Escaping { quoted: true })
        );
        assert_eq!(ScanState::InQuote.next('"', &policy), Some(ScanState::Normal));

        assert_eq!(
            ScanState::Escaping { quoted: false }.next(',', &policy),
            Some(ScanState::Normal)
        );
        assert_eq!(
            ScanState::Escaping { quoted: true }.next('"', &policy),
            Some(ScanState::InQuote)
        );
    }

    #[test]
    fn test_break_is_ignored_when_policy_says_so() {
        let policy = ScanPolicy::SD_GROUP;
        assert_eq!(ScanState::Normal.next(' ', &policy), Some(ScanState::Normal));
        assert_eq!(ScanState::Normal.next(']', &policy), None);
        assert_eq!(ScanState::Normal.next('\n', &policy), None);
    }

    #[test]
    fn test_scan_stops_on_break_and_skips_it() {
        let (consumed, token) = scan("a=1,b=2", &ScanPolicy::LINE_PAIR);
        assert_eq!(consumed, 4);
        assert_eq!(token.span, 0..3);
        assert_eq!(token.as_str(), "a=1");
    }

    #[test]
    fn test_scan_at_end_of_input_consumes_token_length() {
        let (consumed, token) = scan("a=1", &ScanPolicy::LINE_PAIR);
        assert_eq!(consumed, 3);
        assert_eq!(token.as_str(), "a=1");
        assert!(matches!(token.content, Cow::Borrowed(_)));
    }

    #[test]
    fn test_scan_strips_escape_markers() {
        let (consumed, token) = scan(r"a\,b=1,c=2", &ScanPolicy::LINE_PAIR);
        assert_eq!(token.as_str(), "a,b=1");
        assert_eq!(token.span, 0..6);
        assert_eq!(consumed, 7);
        assert!(matches!(token.content, Cow::Owned(_)));
    }

    #[test]
    fn test_scan_keeps_escape_markers_without_removal() {
        assert_eq!(
            scan_str(r"a\ b=1 c=2", ScanPolicy::LINE_SECTION),
            (7, r"a\ b=1".to_string())
        );
    }

    #[test]
    fn test_scan_multiple_escapes() {
        assert_eq!(
            scan_str(r"k\ e\,y\=x=v\\w", ScanPolicy::LINE_PAIR),
            (15, r"k e,y=x=v\w".to_string())
        );
    }

    #[test]
    fn test_named_escapes_keep_marker() {
        assert_eq!(
            scan_str(r"v=\x41\,é\0\X0A\U1,z", ScanPolicy::LINE_PAIR).1,
            r"v=\x41,é\0\X0A\U1"
        );
    }

    #[test]
    fn test_break_inside_quotes_is_content() {
        assert_eq!(
            scan_str(r#"s="a,b",n=1"#, ScanPolicy::LINE_PAIR),
            (8, r#"s="a,b""#.to_string())
        );
    }

    #[test]
    fn test_escaped_quote_does_not_close_quote() {
        assert_eq!(
            scan_str(r#"s="a\"b,c",n=1"#, ScanPolicy::LINE_PAIR),
            (11, r#"s="a"b,c""#.to_string())
        );
    }

    #[test]
    fn test_escaped_quote_does_not_open_quote() {
        assert_eq!(
            scan_str(r#"a=\"x,b=2"#, ScanPolicy::LINE_PAIR),
            (6, r#"a="x"#.to_string())
        );
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let input = r#"s="abc,d e"#;
        assert_eq!(scan_str(input, ScanPolicy::LINE_PAIR), (input.len(), input.to_string()));
    }

    #[test]
    fn test_trailing_backslash_is_kept() {
        assert_eq!(scan_str(r"abc\", ScanPolicy::LINE_PAIR), (4, r"abc\".to_string()));
    }

    #[test]
    fn test_multibyte_code_points() {
        let input = "ключ=знач,x=1";
        let (consumed, token) = scan(input, &ScanPolicy::LINE_PAIR);
        assert_eq!(token.as_str(), "ключ=знач");
        assert_eq!(consumed, "ключ=знач".len() + 1);

        // escaped multi-byte character keeps all of its bytes
        assert_eq!(scan_str("a\\é,b", ScanPolicy::LINE_PAIR), (5, "aé".to_string()));
        assert_eq!(scan_str("🧊\\ 🧊 x", ScanPolicy::SD_PAIR).1, "🧊 🧊");
    }

    #[test]
    fn test_sd_group_ends_on_bracket() {
        let input = r#"[id a="1"][id2 b="2"]"#;
        let (consumed, token) = scan(input, &ScanPolicy::SD_GROUP);
        assert_eq!(token.as_str(), r#"[id a="1""#);
        assert_eq!(consumed, 10);
        assert_eq!(&input[consumed..], r#"[id2 b="2"]"#);
    }

    #[test]
    fn test_sd_group_bracket_inside_quotes() {
        assert_eq!(
            scan_str(r#"[id a="x]y"]rest"#, ScanPolicy::SD_GROUP).1,
            r#"[id a="x]y""#
        );
    }

    #[test]
    fn test_sd_group_escaped_bracket() {
        assert_eq!(
            scan_str(r#"[id a=x\]y]rest"#, ScanPolicy::SD_GROUP).1,
            r#"[id a=x\]y"#
        );
    }

    #[test]
    fn test_sd_group_ends_on_newline() {
        assert_eq!(
            scan_str("[id a=\"1\"\n[b]", ScanPolicy::SD_GROUP),
            (10, "[id a=\"1\"".to_string())
        );
    }

    #[test]
    fn test_sd_group_rejects_leading_space() {
        let input = r#" [id a="1"]"#;
        let (consumed, token) = scan(input, &ScanPolicy::SD_GROUP);
        assert_eq!(consumed, input.len());
        assert!(token.is_empty());
    }

    #[test]
    fn test_sd_pair_strips_escapes_inside_quotes() {
        assert_eq!(
            scan_str(r#"a="say \"hi\"" b="2""#, ScanPolicy::SD_PAIR),
            (15, r#"a="say "hi"""#.to_string())
        );
    }

    #[test]
    fn test_scanner_iterates_with_absolute_spans() {
        let tokens: Vec<(Range<usize>, String)> = Scanner::new("a=1,b=2,c=3", ScanPolicy::LINE_PAIR)
            .map(|t| (t.span.clone(), t.content.into_owned()))
            .collect();
        assert_eq!(
            tokens,
            vec![
                (0..3, "a=1".to_string()),
                (4..7, "b=2".to_string()),
                (8..11, "c=3".to_string()),
            ]
        );
    }

    #[test]
    fn test_scanner_empty_input_yields_nothing() {
        assert_eq!(Scanner::new("", ScanPolicy::LINE_SECTION).count(), 0);
    }

    #[test]
    fn test_scanner_trailing_separator() {
        let mut scanner = Scanner::new("a=1,", ScanPolicy::LINE_PAIR);
        assert_eq!(scanner.next().map(|t| t.content.into_owned()), Some("a=1".to_string()));
        assert!(scanner.is_exhausted());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_scanner_skip_whitespace() {
        let mut scanner = Scanner::new(r#"[a x="1"]  [b y="2"]"#, ScanPolicy::SD_GROUP);
        assert_eq!(scanner.next().unwrap().as_str(), r#"[a x="1""#);
        scanner.skip_whitespace();
        assert_eq!(scanner.remainder(), r#"[b y="2"]"#);
        assert_eq!(scanner.next().unwrap().as_str(), r#"[b y="2""#);
        assert!(scanner.next().is_none());
    }
}
