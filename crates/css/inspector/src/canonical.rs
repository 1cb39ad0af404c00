//! Order-independent canonical rule text, and LCS-based alignment between
//! two flat rule lists. This is what re-establishes rule correspondence
//! after the live object model has drifted from the last parse.

use css_om::{CssRule, StyleDeclaration};

/// Canonical text of a rule: declaration blocks are re-serialized with
/// property names sorted by code point, so two semantically-reordered but
/// equal blocks canonicalize identically. Other rule kinds fall back to
/// their native serialization.
pub fn canonical_rule_text(rule: &CssRule) -> String {
    match rule {
        CssRule::Style(style_rule) => {
            canonical_block(&style_rule.selector_text, &style_rule.style)
        }
        CssRule::Keyframe(keyframe) => canonical_block(&keyframe.key_text, &keyframe.style),
        other => other.css_text(),
    }
}

fn canonical_block(header: &str, style: &StyleDeclaration) -> String {
    let mut entries: Vec<(String, String)> = style
        .properties()
        .iter()
        .map(|property| {
            let mut rendered = format!("{}:{}", property.name, property.value);
            if property.important {
                rendered.push_str(" !important");
            }
            (property.name.clone(), rendered)
        })
        .collect();
    // Stable sort: same-name declarations keep their relative order, which
    // is semantically significant (last one wins).
    entries.sort_by(|left, right| left.0.cmp(&right.0));
    let body: Vec<String> = entries.into_iter().map(|(_, rendered)| rendered).collect();
    format!("{header} {{ {} }}", body.join("; "))
}

/// Bidirectional index maps between two aligned lists. Unmapped positions
/// are rules inserted or deleted on one side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexMapping {
    pub left_to_right: Vec<Option<usize>>,
    pub right_to_left: Vec<Option<usize>>,
}

/// Align two sequences of canonical rule texts. Common prefix and suffix
/// are stripped directly into the maps; the remaining middle segment runs
/// through a standard LCS table. Incremental edits keep that segment
/// small, which is what makes the O(n·m) middle affordable.
pub fn align_canonical(left: &[String], right: &[String]) -> IndexMapping {
    let left_len = left.len();
    let right_len = right.len();
    let mut mapping = IndexMapping {
        left_to_right: vec![None; left_len],
        right_to_left: vec![None; right_len],
    };

    let max_common = left_len.min(right_len);
    let mut prefix = 0;
    while prefix < max_common && left[prefix] == right[prefix] {
        mapping.left_to_right[prefix] = Some(prefix);
        mapping.right_to_left[prefix] = Some(prefix);
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < max_common - prefix
        && left[left_len - 1 - suffix] == right[right_len - 1 - suffix]
    {
        mapping.left_to_right[left_len - 1 - suffix] = Some(right_len - 1 - suffix);
        mapping.right_to_left[right_len - 1 - suffix] = Some(left_len - 1 - suffix);
        suffix += 1;
    }

    let left_mid = &left[prefix..left_len - suffix];
    let right_mid = &right[prefix..right_len - suffix];
    let rows = left_mid.len();
    let cols = right_mid.len();
    if rows == 0 || cols == 0 {
        return mapping;
    }

    let stride = cols + 1;
    let mut table = vec![0u32; (rows + 1) * stride];
    for row in 1..=rows {
        for col in 1..=cols {
            table[row * stride + col] = if left_mid[row - 1] == right_mid[col - 1] {
                table[(row - 1) * stride + (col - 1)] + 1
            } else {
                table[(row - 1) * stride + col].max(table[row * stride + (col - 1)])
            };
        }
    }

    let mut row = rows;
    let mut col = cols;
    while row > 0 && col > 0 {
        if left_mid[row - 1] == right_mid[col - 1] {
            mapping.left_to_right[prefix + row - 1] = Some(prefix + col - 1);
            mapping.right_to_left[prefix + col - 1] = Some(prefix + row - 1);
            row -= 1;
            col -= 1;
        } else if table[(row - 1) * stride + col] >= table[row * stride + (col - 1)] {
            row -= 1;
        } else {
            col -= 1;
        }
    }
    mapping
}
