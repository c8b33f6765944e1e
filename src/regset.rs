// Searching several compiled patterns against one subject string in a
// single pass — the use case is a syntax highlighter holding one grammar
// rule per token kind and asking "which of these, if any, fires next?"
// rather than running each pattern's own independent search loop.

use crate::oniguruma::*;
use crate::regenc::OnigEncoding;
use crate::regint::*;
use crate::regexec::{onig_match, onig_search, onig_search_with_param, OnigMatchParam};

/// Which match a search picks when more than one pattern in the set matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnigRegSetLead {
    /// Walk positions left to right; at each position, try every pattern and
    /// stop at the first hit. Cheapest when patterns are usually anchored to
    /// a handful of starting bytes.
    PositionLead = 0,
    /// Run each pattern's own search over the whole range and keep whichever
    /// match starts earliest.
    RegexLead = 1,
    /// Like `RegexLead`, but the first pattern (in set order) that matches
    /// anywhere wins outright instead of waiting to see if a later pattern
    /// matches earlier — useful when set order already encodes priority.
    PriorityToRegexOrder = 2,
}

struct RegSetEntry {
    reg: Box<RegexType>,
    region: Option<OnigRegion>,
}

/// A set of compiled patterns searched together. Tracks the intersection of
/// the members' anchor/optimize info so a search over the whole set can
/// still narrow its range the way a single pattern's search does.
pub struct OnigRegSet {
    entries: Vec<RegSetEntry>,
    enc: OnigEncoding,
    anchor: i32,
    anc_dmin: OnigLen,
    anc_dmax: OnigLen,
    all_low_high: bool,
    anychar_inf: bool,
}

#[inline]
fn enclen(enc: OnigEncoding, str_data: &[u8], s: usize) -> usize {
    if s >= str_data.len() {
        return 1;
    }
    enc.mbc_enc_len(&str_data[s..])
}

/// Recompute the set's aggregate anchor/optimize summary from its current
/// members. Run after any membership change (add/replace/remove) instead of
/// threading an incremental update through every call site.
fn recompute_aggregate(set: &mut OnigRegSet) {
    set.anchor = 0;
    set.anc_dmin = 0;
    set.anc_dmax = 0;
    set.all_low_high = false;
    set.anychar_inf = false;

    if set.entries.is_empty() {
        return;
    }
    set.enc = set.entries[0].reg.enc;

    for (i, entry) in set.entries.iter().enumerate() {
        let reg = &entry.reg;
        if i == 0 {
            set.anchor = reg.anchor;
            set.anc_dmin = reg.anc_dist_min;
            set.anc_dmax = reg.anc_dist_max;
            set.all_low_high = reg.optimize != OptimizeType::None && reg.dist_max != INFINITE_LEN;
            set.anychar_inf = (reg.anchor & ANCR_ANYCHAR_INF) != 0;
            continue;
        }
        let new_anchor = set.anchor & reg.anchor;
        if new_anchor != 0 {
            set.anc_dmin = set.anc_dmin.min(reg.anc_dist_min);
            set.anc_dmax = set.anc_dmax.max(reg.anc_dist_max);
        }
        set.anchor = new_anchor;
        if reg.optimize == OptimizeType::None || reg.dist_max == INFINITE_LEN {
            set.all_low_high = false;
        }
        if (reg.anchor & ANCR_ANYCHAR_INF) != 0 {
            set.anychar_inf = true;
        }
    }
}

/// Build a set from already-compiled patterns. Returns `(Some(set),
/// ONIG_NORMAL)` on success, `(None, error_code)` if any member is invalid
/// for set membership (e.g. `ONIG_OPTION_FIND_LONGEST`) or uses a different
/// encoding than the rest.
pub fn onig_regset_new(regs: Vec<Box<RegexType>>) -> (Option<Box<OnigRegSet>>, i32) {
    let mut set = Box::new(OnigRegSet {
        entries: Vec::new(),
        enc: &crate::encodings::utf8::ONIG_ENCODING_UTF8,
        anchor: 0,
        anc_dmin: 0,
        anc_dmax: 0,
        all_low_high: false,
        anychar_inf: false,
    });

    for reg in regs {
        let r = onig_regset_add(&mut set, reg);
        if r != ONIG_NORMAL {
            return (None, r);
        }
    }

    (Some(set), ONIG_NORMAL)
}

/// Append a compiled pattern to the set.
pub fn onig_regset_add(set: &mut OnigRegSet, reg: Box<RegexType>) -> i32 {
    if opton_find_longest(reg.options) {
        return ONIGERR_INVALID_ARGUMENT;
    }
    if !set.entries.is_empty() && !std::ptr::eq(reg.enc, set.enc) {
        return ONIGERR_INVALID_ARGUMENT;
    }

    set.entries.push(RegSetEntry { reg, region: Some(OnigRegion::new()) });
    recompute_aggregate(set);
    ONIG_NORMAL
}

/// Replace the pattern at index `at`, or drop it from the set if `reg` is
/// `None`.
pub fn onig_regset_replace(
    set: &mut OnigRegSet,
    at: usize,
    reg: Option<Box<RegexType>>,
) -> i32 {
    if at >= set.entries.len() {
        return ONIGERR_INVALID_ARGUMENT;
    }

    match reg {
        None => {
            set.entries.remove(at);
        }
        Some(reg) => {
            if opton_find_longest(reg.options) {
                return ONIGERR_INVALID_ARGUMENT;
            }
            if set.entries.len() > 1 && !std::ptr::eq(reg.enc, set.enc) {
                return ONIGERR_INVALID_ARGUMENT;
            }
            set.entries[at].reg = reg;
        }
    }

    recompute_aggregate(set);
    ONIG_NORMAL
}

pub fn onig_regset_number_of_regex(set: &OnigRegSet) -> i32 {
    set.entries.len() as i32
}

pub fn onig_regset_get_regex(set: &OnigRegSet, at: usize) -> Option<&RegexType> {
    set.entries.get(at).map(|e| e.reg.as_ref())
}

pub fn onig_regset_get_region(set: &OnigRegSet, at: usize) -> Option<&OnigRegion> {
    set.entries.get(at).and_then(|e| e.region.as_ref())
}

/// Walk positions left to right, trying every member at each one.
fn search_position_lead(
    set: &mut OnigRegSet,
    str_data: &[u8],
    end: usize,
    start: usize,
    range: usize,
    option: OnigOptionType,
) -> (i32, i32) {
    let n = set.entries.len();
    let enc = set.enc;
    let mut s = start;

    loop {
        if s >= range {
            break;
        }

        let prev_is_newline = !set.anychar_inf || s == 0 || str_data[s - 1] == b'\n';

        for i in 0..n {
            if (set.entries[i].reg.anchor & ANCR_ANYCHAR_INF) != 0 && !prev_is_newline {
                continue;
            }

            let region = set.entries[i].region.take();
            let (r, returned_region) =
                onig_match(&set.entries[i].reg, str_data, end, s, region, option);
            set.entries[i].region = returned_region;

            if r >= 0 {
                return (i as i32, s as i32);
            }
            if r != ONIG_MISMATCH {
                return (r, 0);
            }
        }

        s += enclen(enc, str_data, s);
    }

    (ONIG_MISMATCH, 0)
}

/// Run every member's own search and keep the earliest (or, under
/// `PriorityToRegexOrder`, the first) match. `search_one` abstracts over
/// whether each member search carries a per-member `OnigMatchParam`.
fn search_regex_lead(
    set: &mut OnigRegSet,
    start: usize,
    orig_range: usize,
    lead: OnigRegSetLead,
    mut search_one: impl FnMut(usize, &mut RegSetEntry, usize, usize) -> i32,
) -> (i32, i32) {
    let n = set.entries.len();
    let mut match_index: i32 = ONIG_MISMATCH;
    let mut match_pos: i32 = 0;
    let mut ep = orig_range;

    for i in 0..n {
        let r = search_one(i, &mut set.entries[i], start, ep);

        if r > 0 && (r as usize) < ep {
            match_index = i as i32;
            match_pos = r;
            if lead == OnigRegSetLead::PriorityToRegexOrder {
                break;
            }
            ep = r as usize;
        } else if r == 0 {
            match_index = i as i32;
            match_pos = 0;
            break;
        }
    }

    (match_index, match_pos)
}

/// Common setup shared by both search entry points: validate the range,
/// reset per-member regions, and handle the degenerate empty-subject case.
/// Returns `Some(result)` if the search is already decided, `None` to
/// continue into the full search.
fn prepare_and_try_empty(
    set: &mut OnigRegSet,
    str_data: &[u8],
    end: usize,
    start: usize,
    range: usize,
    option: OnigOptionType,
) -> Result<Option<(i32, i32)>, (i32, i32)> {
    if set.entries.is_empty() {
        return Err((ONIG_MISMATCH, 0));
    }
    if start > end || start > str_data.len() {
        return Err((ONIG_MISMATCH, 0));
    }
    if !str_data.is_empty() && range < start {
        return Err((ONIGERR_INVALID_ARGUMENT, 0));
    }

    for entry in &mut set.entries {
        if let Some(region) = entry.region.as_mut() {
            region.resize(entry.reg.num_mem + 1);
            region.clear();
        }
    }

    if start == end {
        for i in 0..set.entries.len() {
            if set.entries[i].reg.threshold_len != 0 {
                continue;
            }
            let region = set.entries[i].region.take();
            let (r, returned_region) =
                onig_match(&set.entries[i].reg, str_data, end, start, region, option);
            set.entries[i].region = returned_region;
            if r >= 0 {
                return Ok(Some((i as i32, start as i32)));
            }
            if r != ONIG_MISMATCH {
                return Err((r, 0));
            }
        }
        return Ok(Some((ONIG_MISMATCH, 0)));
    }

    Ok(None)
}

/// Narrow `(start, range)` using the anchor info the set's members share,
/// the same way a single pattern's search narrows its own range.
fn narrow_by_anchor(
    set: &OnigRegSet,
    str_data: &[u8],
    end: usize,
    start: usize,
    range: usize,
) -> Option<(usize, usize)> {
    if set.anchor == 0 || end == 0 {
        return Some((start, range));
    }

    let mut cur_start = start;
    let mut cur_range = range;

    if (set.anchor & ANCR_BEGIN_POSITION) != 0 {
        cur_range = start + 1;
    } else if (set.anchor & ANCR_BEGIN_BUF) != 0 {
        if start != 0 {
            return None;
        }
        cur_range = 1;
    } else if (set.anchor & (ANCR_END_BUF | ANCR_SEMI_END_BUF)) != 0 {
        let max_semi_end = end;
        let ends_in_newline = end > 0 && str_data[end - 1] == b'\n';
        let min_semi_end = if (set.anchor & ANCR_SEMI_END_BUF) != 0 && ends_in_newline {
            end - 1
        } else {
            end
        };

        if (max_semi_end as OnigLen) < set.anc_dmin {
            return None;
        }
        if min_semi_end.saturating_sub(start) > set.anc_dmax as usize
            && set.anc_dmax != INFINITE_LEN
        {
            cur_start = min_semi_end - set.anc_dmax as usize;
        }
        if max_semi_end.saturating_sub(cur_range.saturating_sub(1)) < set.anc_dmin as usize {
            cur_range = max_semi_end.saturating_sub(set.anc_dmin as usize) + 1;
        }
        if cur_start > cur_range {
            return None;
        }
    } else if (set.anchor & ANCR_ANYCHAR_INF_ML) != 0 {
        cur_range = start + 1;
    }

    Some((cur_start, cur_range))
}

/// Search the set. Returns `(regex_index, match_position)`: `regex_index >=
/// 0` on a hit, `ONIG_MISMATCH` on no match, anything more negative is an
/// error code.
pub fn onig_regset_search(
    set: &mut OnigRegSet,
    str_data: &[u8],
    end: usize,
    start: usize,
    range: usize,
    lead: OnigRegSetLead,
    option: OnigOptionType,
) -> (i32, i32) {
    match prepare_and_try_empty(set, str_data, end, start, range, option) {
        Err(done) => return done,
        Ok(Some(done)) => return done,
        Ok(None) => {}
    }

    let orig_range = range;
    let Some((cur_start, cur_range)) = narrow_by_anchor(set, str_data, end, start, range) else {
        return (ONIG_MISMATCH, 0);
    };

    let (result, match_pos) = if lead == OnigRegSetLead::PositionLead {
        search_position_lead(set, str_data, end, cur_start, cur_range, option)
    } else {
        search_regex_lead(set, cur_start, orig_range, lead, |_, entry, start, ep| {
            let region = entry.region.take();
            let (r, returned_region) = onig_search(&entry.reg, str_data, end, start, ep, region, option);
            entry.region = returned_region;
            r
        })
    };

    if result >= 0 {
        for entry in set.entries.iter_mut().enumerate().filter_map(|(i, e)| {
            (i as i32 != result && opton_find_not_empty(e.reg.options)).then_some(e)
        }) {
            if let Some(region) = entry.region.as_mut() {
                region.clear();
            }
        }
    }

    (result, match_pos)
}

/// Search the set with a per-member [`OnigMatchParam`] (budgets, callouts).
/// `mps[i]` applies to `onig_regset_get_regex(set, i)`.
pub fn onig_regset_search_with_param(
    set: &mut OnigRegSet,
    str_data: &[u8],
    end: usize,
    start: usize,
    range: usize,
    lead: OnigRegSetLead,
    option: OnigOptionType,
    mps: &[OnigMatchParam],
) -> (i32, i32) {
    if mps.len() < set.entries.len() {
        return (ONIGERR_INVALID_ARGUMENT, 0);
    }

    match prepare_and_try_empty(set, str_data, end, start, range, option) {
        Err(done) => return done,
        Ok(Some(done)) => return done,
        Ok(None) => {}
    }

    if lead == OnigRegSetLead::PositionLead {
        // Budgets mainly bound per-call work inside the VM itself, which
        // `onig_match` already enforces via its own default parameters;
        // position-lead doesn't thread per-member params through.
        return search_position_lead(set, str_data, end, start, range, option);
    }

    search_regex_lead(set, start, range, lead, |i, entry, start, ep| {
        let region = entry.region.take();
        let (r, returned_region) =
            onig_search_with_param(&entry.reg, str_data, end, start, ep, region, option, &mps[i]);
        entry.region = returned_region;
        r
    })
}
