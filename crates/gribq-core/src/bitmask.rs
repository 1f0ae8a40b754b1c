//! Bitmask codec: named selections <-> hex masks over a [`ReferenceList`].
//!
//! Bit `i` (LSB = 0) flags inclusion of `reference_list[i]`. Masks are
//! arbitrary width (stored as little-endian 64-bit words) because model
//! reference lists easily exceed 128 items.

use crate::error::{QueryError, QueryResult};
use crate::reference::ReferenceList;
use std::fmt;
use std::sync::Arc;

const HEX_PREFIX: &str = "0x";
const WORD_BITS: usize = 64;
const WORD_HEX_DIGITS: usize = 16;

/// Raw mask value, not yet tied to a reference list.
///
/// Always normalized: no trailing zero words, so equal values compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MaskBits {
    words: Vec<u64>,
}

impl MaskBits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `0x`-prefixed hex (prefix and digits case-insensitive).
    pub fn from_hex(text: &str) -> QueryResult<Self> {
        let malformed = || QueryError::MalformedMask(text.to_string());
        let digits = text
            .strip_prefix(HEX_PREFIX)
            .or_else(|| text.strip_prefix("0X"))
            .ok_or_else(malformed)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed());
        }

        let mut words = Vec::with_capacity(digits.len() / WORD_HEX_DIGITS + 1);
        let mut end = digits.len();
        while end > 0 {
            let start = end.saturating_sub(WORD_HEX_DIGITS);
            let word = u64::from_str_radix(&digits[start..end], 16).map_err(|_| malformed())?;
            words.push(word);
            end = start;
        }
        let mut bits = MaskBits { words };
        bits.normalize();
        Ok(bits)
    }

    /// Lowercase hex with `0x` prefix and no leading zeros (`0x0` when empty).
    pub fn to_hex(&self) -> String {
        let Some((last, rest)) = self.words.split_last() else {
            return format!("{HEX_PREFIX}0");
        };
        let mut out = format!("{HEX_PREFIX}{last:x}");
        for word in rest.iter().rev() {
            out.push_str(&format!("{word:016x}"));
        }
        out
    }

    pub fn set(&mut self, index: usize) {
        let word_idx = index / WORD_BITS;
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }
        self.words[word_idx] |= 1u64 << (index % WORD_BITS);
    }

    /// Position of the most significant set bit.
    pub fn highest_bit(&self) -> Option<usize> {
        let last = *self.words.last()?;
        let top = WORD_BITS - 1 - last.leading_zeros() as usize;
        Some((self.words.len() - 1) * WORD_BITS + top)
    }

    /// Number of bits needed to represent the value (0 for the empty mask).
    pub fn bit_len(&self) -> usize {
        self.highest_bit().map(|b| b + 1).unwrap_or(0)
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Indices of set bits, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            (0..WORD_BITS)
                .filter(move |b| word & (1u64 << *b) != 0)
                .map(move |b| wi * WORD_BITS + b)
        })
    }

    fn normalize(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl fmt::Display for MaskBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A mask paired with the reference list it was decoded against.
/// Invariant: `bits.bit_len() <= list.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    list: Arc<ReferenceList>,
    bits: MaskBits,
}

impl SelectionMask {
    /// Bind raw bits to `list`, rejecting bits beyond its length.
    pub fn new(list: Arc<ReferenceList>, bits: MaskBits) -> QueryResult<Self> {
        check_range(&list, &bits)?;
        Ok(SelectionMask { list, bits })
    }

    pub fn from_hex(list: Arc<ReferenceList>, hex: &str) -> QueryResult<Self> {
        Self::new(list, MaskBits::from_hex(hex)?)
    }

    pub fn bits(&self) -> &MaskBits {
        &self.bits
    }

    pub fn reference_list(&self) -> &Arc<ReferenceList> {
        &self.list
    }

    pub fn to_hex(&self) -> String {
        self.bits.to_hex()
    }

    /// Selected ids in reference-list order.
    pub fn selected(&self) -> impl Iterator<Item = &str> + '_ {
        self.bits.iter_ones().filter_map(|i| self.list.get(i))
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// Set bit `i` for every selected id; unknown ids are an `InvalidSelection`.
pub fn encode<S: AsRef<str>>(
    list: &Arc<ReferenceList>,
    selected_ids: &[S],
) -> QueryResult<SelectionMask> {
    let mut bits = MaskBits::new();
    for id in selected_ids {
        let id = id.as_ref();
        let pos = list
            .position(id)
            .ok_or_else(|| QueryError::InvalidSelection { id: id.to_string() })?;
        bits.set(pos);
    }
    Ok(SelectionMask {
        list: Arc::clone(list),
        bits,
    })
}

/// Ids whose bits are set, in reference-list order.
pub fn decode(list: &ReferenceList, bits: &MaskBits) -> QueryResult<Vec<String>> {
    check_range(list, bits)?;
    Ok(bits
        .iter_ones()
        .filter_map(|i| list.get(i))
        .map(str::to_string)
        .collect())
}

fn check_range(list: &ReferenceList, bits: &MaskBits) -> QueryResult<()> {
    match bits.highest_bit() {
        Some(highest_bit) if highest_bit >= list.len() => Err(QueryError::MaskOutOfRange {
            highest_bit,
            len: list.len(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(n: usize) -> Arc<ReferenceList> {
        Arc::new(ReferenceList::new((0..n).map(|i| format!("item{i}"))).unwrap())
    }

    #[test]
    fn encode_sets_lsb_first() {
        let rl = Arc::new(ReferenceList::new(["TMP", "UGRD", "VGRD", "PRMSL"]).unwrap());
        let mask = encode(&rl, &["TMP", "VGRD"]).unwrap();
        assert_eq!(mask.to_hex(), "0x5");
        let mask = encode(&rl, &["PRMSL"]).unwrap();
        assert_eq!(mask.to_hex(), "0x8");
    }

    #[test]
    fn encode_unknown_id_is_invalid_selection() {
        let rl = Arc::new(ReferenceList::new(["TMP", "UGRD"]).unwrap());
        let err = encode(&rl, &["TMP", "GUST"]).unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidSelection {
                id: "GUST".to_string()
            }
        );
    }

    #[test]
    fn decode_out_of_range() {
        let rl = list(4);
        let bits = MaskBits::from_hex("0x10").unwrap();
        assert_eq!(
            decode(&rl, &bits).unwrap_err(),
            QueryError::MaskOutOfRange {
                highest_bit: 4,
                len: 4
            }
        );
        assert!(decode(&rl, &MaskBits::from_hex("0xf").unwrap()).is_ok());
    }

    #[test]
    fn round_trip_subsets_across_word_boundaries() {
        let rl = list(150);
        let subsets: Vec<Vec<String>> = vec![
            vec![],
            vec!["item0".into()],
            vec!["item63".into(), "item64".into()],
            vec!["item1".into(), "item70".into(), "item149".into()],
            (0..150).map(|i| format!("item{i}")).collect(),
        ];
        for subset in subsets {
            let mask = encode(&rl, &subset).unwrap();
            assert_eq!(decode(&rl, mask.bits()).unwrap(), subset);

            let reparsed = MaskBits::from_hex(&mask.to_hex()).unwrap();
            assert_eq!(&reparsed, mask.bits());
        }
    }

    #[test]
    fn decoded_selection_reencodes_to_same_hex() {
        let rl = list(80);
        for hex in ["0x0", "0x1", "0x8000000000000000", "0xffff0000000000000001"] {
            let bits = MaskBits::from_hex(hex).unwrap();
            let ids = decode(&rl, &bits).unwrap();
            assert_eq!(encode(&rl, &ids).unwrap().to_hex(), hex);
        }
    }

    #[test]
    fn hex_parsing_is_case_insensitive_and_strips_leading_zeros() {
        assert_eq!(MaskBits::from_hex("0XFF").unwrap().to_hex(), "0xff");
        assert_eq!(MaskBits::from_hex("0x00aB").unwrap().to_hex(), "0xab");
        assert_eq!(MaskBits::from_hex("0x0000").unwrap().to_hex(), "0x0");
        assert_eq!(
            MaskBits::from_hex("0x10000000000000000").unwrap().highest_bit(),
            Some(64)
        );
    }

    #[test]
    fn malformed_hex_rejected() {
        for bad in ["", "ff", "0x", "0xfg", "x12", "0x 1", "-0x1", "0x+1"] {
            assert!(
                matches!(MaskBits::from_hex(bad), Err(QueryError::MalformedMask(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn selection_mask_lists_ids_in_order() {
        let rl = Arc::new(ReferenceList::new(["a", "b", "c", "d"]).unwrap());
        let mask = SelectionMask::from_hex(Arc::clone(&rl), "0xa").unwrap();
        assert_eq!(mask.selected().collect::<Vec<_>>(), vec!["b", "d"]);
        assert_eq!(mask.len(), 2);
        assert!(SelectionMask::from_hex(rl, "0x1f").is_err());
    }
}
