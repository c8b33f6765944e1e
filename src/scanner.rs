// High-level multi-pattern entry point: hand it a grammar's worth of patterns once,
// then repeatedly ask "which of these fires first from here" as a cursor walks
// across a document. This is the shape a textmate-style tokenizer wants: one
// scan per line, one winner per scan, captures read straight off the winner.

use smallvec::SmallVec;

use crate::encodings::utf8::ONIG_ENCODING_UTF8;
use crate::error::RegexError;
use crate::oniguruma::*;
use crate::regcomp::onig_new;
use crate::regexec::{onig_search_with_msa, MatchArg};
use crate::regint::RegexType;
use crate::regset::{onig_regset_new, onig_regset_search, OnigRegSet, OnigRegSetLead};
use crate::regsyntax::*;

/// One capture group's extent within the subject, in whatever unit the
/// calling API works in (bytes for [`Scanner::find_next_match`], UTF-16 code
/// units for the `_utf16` variants).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureIndex {
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

/// The winning pattern and its capture groups. Index 0 of `capture_indices`
/// is always the full match; later entries line up with parenthesized groups
/// in source order, regardless of how deeply nested they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerMatch {
    pub index: usize,
    pub capture_indices: SmallVec<[CaptureIndex; 8]>,
}

/// Per-call search constraints, independent of how the scanner was built.
/// A tokenizer typically derives these from where the cursor sits on a line:
/// mid-line never needs `NOT_BEGIN_STRING`, but a continuation of a multi-line
/// token might want `NOT_BEGIN_POSITION` to stop `\G` from re-anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerFindOptions(u32);

impl ScannerFindOptions {
    pub const NONE: Self = Self(0);
    pub const NOT_BEGIN_STRING: Self = Self(1);
    pub const NOT_END_STRING: Self = Self(2);
    pub const NOT_BEGIN_POSITION: Self = Self(4);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    fn to_onig_options(self) -> OnigOptionType {
        let mut opts = ONIG_OPTION_NONE;
        if self.0 & Self::NOT_BEGIN_STRING.0 != 0 {
            opts |= ONIG_OPTION_NOT_BEGIN_STRING;
        }
        if self.0 & Self::NOT_END_STRING.0 != 0 {
            opts |= ONIG_OPTION_NOT_END_STRING;
        }
        if self.0 & Self::NOT_BEGIN_POSITION.0 != 0 {
            opts |= ONIG_OPTION_NOT_BEGIN_POSITION;
        }
        opts
    }
}

/// Grammar dialect applied to every pattern a scanner is built from. A
/// tokenizer generally picks one for its whole rule set rather than mixing
/// dialects within a single scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerSyntax {
    Oniguruma,
    Asis,
    PosixBasic,
    PosixExtended,
    Emacs,
    Grep,
    GnuRegex,
    Java,
    Perl,
    PerlNg,
    Ruby,
    Python,
}

impl ScannerSyntax {
    fn resolve(&self) -> &'static OnigSyntaxType {
        match self {
            Self::Oniguruma => &OnigSyntaxOniguruma,
            Self::Asis => &OnigSyntaxASIS,
            Self::PosixBasic => &OnigSyntaxPosixBasic,
            Self::PosixExtended => &OnigSyntaxPosixExtended,
            Self::Emacs => &OnigSyntaxEmacs,
            Self::Grep => &OnigSyntaxGrep,
            Self::GnuRegex => &OnigSyntaxGnuRegex,
            Self::Java => &OnigSyntaxJava,
            Self::Perl => &OnigSyntaxPerl,
            Self::PerlNg => &OnigSyntaxPerl_NG,
            Self::Ruby => &OnigSyntaxRuby,
            Self::Python => &OnigSyntaxPython,
        }
    }
}

impl Default for ScannerSyntax {
    fn default() -> Self {
        Self::Oniguruma
    }
}

/// Build-time settings shared by every pattern in a [`Scanner`].
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    pub options: OnigOptionType,
    pub syntax: ScannerSyntax,
}

/// A string paired with the offset tables needed to translate between UTF-8
/// byte positions (what the engine searches over) and UTF-16 code units
/// (what callers coming from a UTF-16-native host language hand in and
/// expect back). Building the tables once up front means a tokenizer that
/// calls `find_next_match_utf16` once per token doesn't re-scan the whole
/// line's code points on every call.
///
/// ```
/// use onigvm::scanner::OnigString;
///
/// let s = OnigString::new("a\u{1F4BB}b");
/// assert_eq!(s.utf16_len(), 4); // a(1) + the emoji as a surrogate pair(2) + b(1)
/// assert_eq!(s.content().len(), 6); // the emoji takes 4 bytes in UTF-8
/// ```
pub struct OnigString {
    content: String,
    /// index = UTF-16 code unit offset, value = matching UTF-8 byte offset.
    /// One entry longer than the string so the end-of-string position is a
    /// plain lookup rather than a special case.
    utf16_to_utf8: Vec<usize>,
    /// index = UTF-8 byte offset, value = matching UTF-16 code unit offset.
    utf8_to_utf16: Vec<usize>,
}

impl OnigString {
    pub fn new(content: &str) -> Self {
        let utf8_len = content.len();
        let utf16_len: usize = content.chars().map(|c| c.len_utf16()).sum();

        let mut utf16_to_utf8 = Vec::with_capacity(utf16_len + 1);
        let mut utf8_to_utf16 = vec![0usize; utf8_len + 1];

        let mut utf8_pos = 0;
        for ch in content.chars() {
            let u8_len = ch.len_utf8();
            let u16_len = ch.len_utf16();

            utf16_to_utf8.push(utf8_pos);
            let utf16_pos = utf16_to_utf8.len() - 1;
            for b in 0..u8_len {
                utf8_to_utf16[utf8_pos + b] = utf16_pos;
            }

            if u16_len == 2 {
                // surrogate pair: the low half lands right after this char's bytes
                utf16_to_utf8.push(utf8_pos + u8_len);
            }

            utf8_pos += u8_len;
        }

        utf16_to_utf8.push(utf8_pos);
        utf8_to_utf16[utf8_pos] = utf16_len;

        OnigString { content: content.to_string(), utf16_to_utf8, utf8_to_utf16 }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn utf16_len(&self) -> usize {
        self.utf16_to_utf8.len() - 1
    }

    fn utf16_offset_to_utf8(&self, utf16_offset: usize) -> usize {
        self.utf16_to_utf8
            .get(utf16_offset)
            .copied()
            .unwrap_or(self.content.len())
    }

    fn utf8_offset_to_utf16(&self, utf8_offset: usize) -> usize {
        self.utf8_to_utf16
            .get(utf8_offset)
            .copied()
            .unwrap_or_else(|| self.utf16_len())
    }
}

/// Remembers the outcome of the last search against a given `str_id`, so that
/// advancing the start position past a no-match region (the common case when
/// a tokenizer walks forward token by token) doesn't re-run the VM for every
/// pattern that already proved it won't hit before some known point.
struct SearchMemo {
    /// `\G` ties a match to the exact position it started at, so a memoized
    /// hit at an earlier position says nothing about this one; such patterns
    /// opt out of memoization entirely.
    position_sensitive: bool,
    str_id: u64,
    searched_from: usize,
    options: u32,
    outcome: Outcome,
    region: Option<OnigRegion>,
}

#[derive(Clone, Copy)]
enum Outcome {
    /// No prior search recorded, or the prior search used a different string/options.
    Unknown,
    NoMatch,
    /// VM-reported start offset of the match, which may be `>= searched_from`.
    MatchAt(usize),
}

impl SearchMemo {
    fn new(pattern: &str) -> Self {
        SearchMemo {
            position_sensitive: pattern.contains("\\G"),
            str_id: 0,
            searched_from: 0,
            options: u32::MAX,
            outcome: Outcome::Unknown,
            region: None,
        }
    }

    /// If the last search against `str_id`/`options` already answered the
    /// question for a search starting at `from`, returns that answer without
    /// re-running anything. A memoized match only applies when its recorded
    /// offset still lies at or after `from`; a memoized match *before* `from`
    /// tells us nothing about whether a later search would still find it.
    fn reuse(&self, str_id: u64, options: u32, from: usize) -> Option<Outcome> {
        if self.position_sensitive || self.str_id != str_id || self.options != options || self.searched_from > from {
            return None;
        }
        match self.outcome {
            Outcome::Unknown => None,
            Outcome::NoMatch => Some(Outcome::NoMatch),
            Outcome::MatchAt(pos) if pos >= from => Some(Outcome::MatchAt(pos)),
            Outcome::MatchAt(_) => None,
        }
    }

    fn record(&mut self, str_id: u64, from: usize, options: u32, outcome: Outcome, region: Option<OnigRegion>) {
        self.str_id = str_id;
        self.searched_from = from;
        self.options = options;
        self.outcome = outcome;
        self.region = region;
    }
}

/// Below this subject length, one [`OnigRegSet`] pass beats N independent
/// per-pattern searches; above it, the per-pattern path with memoization
/// wins because most patterns will have already ruled themselves out for
/// nearby start positions.
const REGSET_FAST_PATH_LIMIT: usize = 1000;

/// Holds one compiled program per pattern plus the bookkeeping (a shared
/// [`OnigRegSet`] for short subjects, a memo table for long ones) needed to
/// answer "first pattern to match from here" efficiently across many calls
/// against the same or related subjects.
///
/// ```
/// use onigvm::scanner::{Scanner, ScannerFindOptions};
///
/// let mut scanner = Scanner::new(&["\\d+", "[a-z]+"]).unwrap();
/// let m = scanner.find_next_match("hello42", 0, ScannerFindOptions::NONE).unwrap();
/// assert_eq!(m.index, 1); // "[a-z]+" fires before "\\d+" does
/// assert_eq!(m.capture_indices[0].start, 0);
/// assert_eq!(m.capture_indices[0].end, 5);
/// ```
pub struct Scanner {
    regexes: Vec<Box<RegexType>>,
    memos: Vec<SearchMemo>,
    regset: Box<OnigRegSet>,
}

impl Scanner {
    pub fn new(patterns: &[&str]) -> Result<Scanner, RegexError> {
        Self::with_config(patterns, &ScannerConfig::default())
    }

    /// ```
    /// use onigvm::scanner::{Scanner, ScannerConfig, ScannerSyntax, ScannerFindOptions};
    /// use onigvm::oniguruma::ONIG_OPTION_IGNORECASE;
    ///
    /// let config = ScannerConfig {
    ///     options: ONIG_OPTION_IGNORECASE,
    ///     syntax: ScannerSyntax::Oniguruma,
    /// };
    /// let mut scanner = Scanner::with_config(&["hello"], &config).unwrap();
    /// assert!(scanner.find_next_match("HELLO", 0, ScannerFindOptions::NONE).is_some());
    /// ```
    pub fn with_config(patterns: &[&str], config: &ScannerConfig) -> Result<Scanner, RegexError> {
        let syntax = config.syntax.resolve();
        let compile = |pattern: &str| onig_new(pattern.as_bytes(), config.options, &ONIG_ENCODING_UTF8, syntax);

        let mut regexes = Vec::with_capacity(patterns.len());
        let mut memos = Vec::with_capacity(patterns.len());
        // The regset needs its own owned copy of each program, distinct from
        // the one kept in `regexes` for the per-pattern path, so every
        // pattern is compiled twice up front in exchange for never having to
        // compile again on the hot path.
        let mut regset_members = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            regexes.push(Box::new(compile(pattern)?));
            regset_members.push(Box::new(compile(pattern)?));
            memos.push(SearchMemo::new(pattern));
        }

        let (regset, result) = onig_regset_new(regset_members);
        if result != ONIG_NORMAL {
            return Err(result.into());
        }

        Ok(Scanner { regexes, memos, regset: regset.unwrap() })
    }

    /// Search `text` for the earliest-starting pattern at or after
    /// `start_position` (a byte offset).
    pub fn find_next_match(
        &mut self,
        text: &str,
        start_position: usize,
        options: ScannerFindOptions,
    ) -> Option<ScannerMatch> {
        self.find_next_match_inner(text, 0, start_position, options, false)
    }

    /// Same as [`Scanner::find_next_match`], but tags the call with `str_id`
    /// so later calls against the same id can reuse this one's per-pattern
    /// no-match results instead of re-searching from scratch.
    pub fn find_next_match_with_id(
        &mut self,
        text: &str,
        str_id: u64,
        start_position: usize,
        options: ScannerFindOptions,
    ) -> Option<ScannerMatch> {
        self.find_next_match_inner(text, str_id, start_position, options, true)
    }

    /// Like [`Scanner::find_next_match`], but `start_position` and the
    /// returned capture offsets are UTF-16 code units rather than bytes.
    ///
    /// ```
    /// use onigvm::scanner::{Scanner, ScannerFindOptions, OnigString};
    ///
    /// let mut scanner = Scanner::new(&["Y", "X"]).unwrap();
    /// let s = OnigString::new("a\u{1F4BB}bYX");
    /// let m = scanner.find_next_match_utf16(&s, 0, ScannerFindOptions::NONE).unwrap();
    /// assert_eq!(m.capture_indices[0].start, 4); // the emoji counts as 2 code units
    /// ```
    pub fn find_next_match_utf16(
        &mut self,
        string: &OnigString,
        start_position: usize,
        options: ScannerFindOptions,
    ) -> Option<ScannerMatch> {
        let utf8_start = string.utf16_offset_to_utf8(start_position);
        let m = self.find_next_match_inner(string.content(), 0, utf8_start, options, false)?;
        Some(project_to_utf16(string, m))
    }

    pub fn find_next_match_utf16_with_id(
        &mut self,
        string: &OnigString,
        str_id: u64,
        start_position: usize,
        options: ScannerFindOptions,
    ) -> Option<ScannerMatch> {
        let utf8_start = string.utf16_offset_to_utf8(start_position);
        let m = self.find_next_match_inner(string.content(), str_id, utf8_start, options, true)?;
        Some(project_to_utf16(string, m))
    }

    fn find_next_match_inner(
        &mut self,
        text: &str,
        str_id: u64,
        start_position: usize,
        options: ScannerFindOptions,
        use_memo: bool,
    ) -> Option<ScannerMatch> {
        let str_data = text.as_bytes();
        let end = str_data.len();
        if start_position > end {
            return None;
        }

        let onig_opts = options.to_onig_options();
        if end < REGSET_FAST_PATH_LIMIT {
            self.search_via_regset(str_data, end, start_position, onig_opts)
        } else {
            self.search_per_pattern(str_data, end, start_position, str_id, options.0, onig_opts, use_memo)
        }
    }

    fn search_via_regset(
        &mut self,
        str_data: &[u8],
        end: usize,
        start: usize,
        option: OnigOptionType,
    ) -> Option<ScannerMatch> {
        let (idx, _pos) =
            onig_regset_search(&mut self.regset, str_data, end, start, end, OnigRegSetLead::PositionLead, option);
        if idx < 0 {
            return None;
        }

        let regex_idx = idx as usize;
        let region = crate::regset::onig_regset_get_region(&self.regset, regex_idx)?;
        Some(build_scanner_match(regex_idx, region))
    }

    /// Walks every pattern in source order, stopping early the moment a
    /// match lands exactly at `start` (nothing earlier than that is
    /// possible). A single [`MatchArg`] is allocated lazily and reused across
    /// patterns within one call; regions carry over between calls via the
    /// memo table so a hit region isn't reallocated every time it's reused.
    fn search_per_pattern(
        &mut self,
        str_data: &[u8],
        end: usize,
        start: usize,
        str_id: u64,
        options_raw: u32,
        onig_opts: OnigOptionType,
        use_memo: bool,
    ) -> Option<ScannerMatch> {
        let mut best: Option<(usize, usize)> = None; // (pattern index, match start)
        let mut msa: Option<MatchArg> = None;

        for i in 0..self.regexes.len() {
            let remembered = use_memo.then(|| self.memos[i].reuse(str_id, options_raw, start)).flatten();

            let outcome = match remembered {
                Some(outcome) => outcome,
                None => {
                    let region = self.memos[i].region.take().unwrap_or_else(OnigRegion::new);
                    let msa = msa.get_or_insert_with(|| MatchArg::new(&self.regexes[i], onig_opts, None, start));
                    msa.reset_for_search(&self.regexes[i], onig_opts, Some(region), start);

                    let (r, returned_region) = onig_search_with_msa(&self.regexes[i], str_data, end, start, end, msa);
                    let outcome = if r >= 0 { Outcome::MatchAt(r as usize) } else { Outcome::NoMatch };
                    self.memos[i].record(str_id, start, options_raw, outcome, returned_region);
                    outcome
                }
            };

            if let Outcome::MatchAt(pos) = outcome {
                let is_better = match best {
                    Some((_, best_pos)) => pos < best_pos,
                    None => true,
                };
                if is_better {
                    best = Some((i, pos));
                    if pos == start {
                        break;
                    }
                }
            }
        }

        let (idx, _) = best?;
        let region = self.memos[idx].region.as_ref()?;
        Some(build_scanner_match(idx, region))
    }
}

fn build_scanner_match(index: usize, region: &OnigRegion) -> ScannerMatch {
    let num_regs = region.num_regs as usize;
    let capture_indices = (0..num_regs)
        .map(|i| {
            let (beg, end) = (region.beg[i], region.end[i]);
            if beg >= 0 && end >= 0 {
                let (start, end) = (beg as usize, end as usize);
                CaptureIndex { start, end, length: end - start }
            } else {
                // group was never entered on this match (e.g. an alternation branch not taken)
                CaptureIndex { start: 0, end: 0, length: 0 }
            }
        })
        .collect();

    ScannerMatch { index, capture_indices }
}

fn project_to_utf16(string: &OnigString, m: ScannerMatch) -> ScannerMatch {
    ScannerMatch {
        index: m.index,
        capture_indices: m
            .capture_indices
            .into_iter()
            .map(|ci| {
                let start = string.utf8_offset_to_utf16(ci.start);
                let end = string.utf8_offset_to_utf16(ci.end);
                CaptureIndex { start, end, length: end - start }
            })
            .collect(),
    }
}
