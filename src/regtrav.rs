// Walks the capture-history tree a match populates in `OnigRegion`.
//
// Iterative rather than recursive: a pathological pattern with deep nested
// groups would otherwise let a caller's traversal blow the Rust stack on a
// tree this crate itself built, which would be a strange place to fail.

use crate::oniguruma::*;

enum Visit<'a> {
    Enter(&'a OnigCaptureTreeNode, i32),
    Leave(&'a OnigCaptureTreeNode, i32),
}

/// Depth-first walk of a match's capture-history tree.
///
/// `at` is a bitmask of [`ONIG_TRAVERSE_CALLBACK_AT_FIRST`] /
/// [`ONIG_TRAVERSE_CALLBACK_AT_LAST`] selecting whether the callback fires on
/// entering a node, leaving it, or both. The callback receives
/// `(group, beg, end, level, at)` and should return `0` to keep walking; any
/// other value aborts the walk and is returned to the caller.
///
/// Returns `0` if the region has no capture history (the feature was not
/// requested for this program).
pub fn onig_capture_tree_traverse<F>(region: &OnigRegion, at: i32, mut callback: F) -> i32
where
    F: FnMut(i32, i32, i32, i32, i32) -> i32,
{
    let Some(root) = region.history_root.as_deref() else {
        return 0;
    };

    let mut pending = vec![Visit::Enter(root, 0)];
    while let Some(visit) = pending.pop() {
        match visit {
            Visit::Enter(node, level) => {
                if at & ONIG_TRAVERSE_CALLBACK_AT_FIRST != 0 {
                    let r = callback(node.group, node.beg, node.end, level, ONIG_TRAVERSE_CALLBACK_AT_FIRST);
                    if r != 0 {
                        return r;
                    }
                }
                pending.push(Visit::Leave(node, level));
                for child in node.childs.iter().rev() {
                    pending.push(Visit::Enter(child, level + 1));
                }
            }
            Visit::Leave(node, level) => {
                if at & ONIG_TRAVERSE_CALLBACK_AT_LAST != 0 {
                    let r = callback(node.group, node.beg, node.end, level, ONIG_TRAVERSE_CALLBACK_AT_LAST);
                    if r != 0 {
                        return r;
                    }
                }
            }
        }
    }
    0
}
