//! Left/right name mirroring and symmetric pose rows

use serde::Serialize;

/// One row of poses: a single pose, or a mirrored pair shown right side first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PoseRow {
    Single(String),
    Pair(String, String),
}

impl PoseRow {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Pair(first, second) => vec![first.as_str(), second.as_str()],
        }
    }
}

fn flip_side(side: u8) -> Option<u8> {
    match side {
        b'L' => Some(b'R'),
        b'R' => Some(b'L'),
        b'l' => Some(b'r'),
        b'r' => Some(b'l'),
        _ => None,
    }
}

fn is_separator(c: u8) -> bool {
    c == b'.' || c == b'_'
}

/// Returns `name` with its L/R affix mirrored, or None if it has none
///
/// Suffixes (`arm.L`, `brow_r`) take priority over prefixes (`L.arm`,
/// `r_brow`). Case is preserved and at least one other character must
/// remain besides the affix.
pub fn flip_name(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let len = bytes.len();
    if len < 3 {
        return None;
    }

    if is_separator(bytes[len - 2]) {
        if let Some(side) = flip_side(bytes[len - 1]) {
            let mut flipped = String::with_capacity(len);
            flipped.push_str(&name[..len - 1]);
            flipped.push(side as char);
            return Some(flipped);
        }
    }

    if is_separator(bytes[1]) {
        if let Some(side) = flip_side(bytes[0]) {
            let mut flipped = String::with_capacity(len);
            flipped.push(side as char);
            flipped.push_str(&name[1..]);
            return Some(flipped);
        }
    }

    None
}

/// Group pose names into rows, pairing each name with its mirror if present
///
/// Names are consumed in order; the mirror of a paired name is removed
/// from the remaining set so each name appears in exactly one row.
pub fn pair_rows<S: AsRef<str>>(names: &[S]) -> Vec<PoseRow> {
    let mut remaining: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    remaining.reverse();

    let mut rows = Vec::with_capacity(remaining.len());
    while let Some(name) = remaining.pop() {
        let mirror = flip_name(name)
            .and_then(|flipped| remaining.iter().position(|n| *n == flipped));

        match mirror {
            Some(index) => {
                let flipped = remaining.remove(index);
                rows.push(PoseRow::Pair(flipped.to_string(), name.to_string()));
            }
            None => rows.push(PoseRow::Single(name.to_string())),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("arm.L", Some("arm.R"); "upper dot suffix")]
    #[test_case("arm.r", Some("arm.l"); "lower dot suffix")]
    #[test_case("brow_L", Some("brow_R"); "upper underscore suffix")]
    #[test_case("brow_l", Some("brow_r"); "lower underscore suffix")]
    #[test_case("L.eye", Some("R.eye"); "upper dot prefix")]
    #[test_case("r.eye", Some("l.eye"); "lower dot prefix")]
    #[test_case("R_cheek", Some("L_cheek"); "upper underscore prefix")]
    #[test_case("L.arm.R", Some("L.arm.L"); "suffix wins over prefix")]
    #[test_case("brow", None; "no affix")]
    #[test_case(".L", None; "affix alone")]
    #[test_case("arm.X", None; "unknown side")]
    #[test_case("armL", None; "missing separator")]
    #[test_case("", None; "empty")]
    #[test_case("épaule.L", Some("épaule.R"); "non ascii stem")]
    fn test_flip_name(name: &str, expected: Option<&str>) {
        assert_eq!(flip_name(name).as_deref(), expected);
    }

    #[test]
    fn test_pair_rows_basic() {
        let rows = pair_rows(&["arm.l", "arm.r", "brow"]);
        assert_eq!(
            rows,
            vec![
                PoseRow::Pair("arm.r".into(), "arm.l".into()),
                PoseRow::Single("brow".into()),
            ]
        );
    }

    #[test]
    fn test_pair_rows_keeps_order() {
        let rows = pair_rows(&["smile", "blink.R", "jaw", "blink.L", "sneer_l"]);
        assert_eq!(
            rows,
            vec![
                PoseRow::Single("smile".into()),
                PoseRow::Pair("blink.L".into(), "blink.R".into()),
                PoseRow::Single("jaw".into()),
                PoseRow::Single("sneer_l".into()),
            ]
        );
        assert_eq!(rows[1].names(), vec!["blink.L", "blink.R"]);
    }

    #[test]
    fn test_pair_rows_empty() {
        assert!(pair_rows::<&str>(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn flip_is_involution(
            stem in "[a-z]{1,8}",
            sep in "[._]",
            side in "[LRlr]",
            suffix in any::<bool>(),
        ) {
            let name = if suffix {
                format!("{stem}{sep}{side}")
            } else {
                format!("{side}{sep}{stem}")
            };
            let flipped = flip_name(&name);
            prop_assert!(flipped.is_some());
            let flipped = flipped.unwrap_or_default();
            prop_assert_ne!(&flipped, &name);
            prop_assert_eq!(flip_name(&flipped), Some(name));
        }

        #[test]
        fn names_without_affix_do_not_flip(name in "[a-km-qs-z]{0,12}") {
            prop_assert_eq!(flip_name(&name), None);
        }

        #[test]
        fn every_name_lands_in_one_row(
            names in proptest::collection::hash_set("[a-c]{1,2}[._][LR]?", 0..10),
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let rows = pair_rows(&names);
            let mut seen: Vec<&str> = rows.iter().flat_map(PoseRow::names).collect();
            seen.sort_unstable();
            let mut expected: Vec<&str> = names.iter().map(String::as_str).collect();
            expected.sort_unstable();
            prop_assert_eq!(seen, expected);
        }
    }
}
