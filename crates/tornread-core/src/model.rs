//! Entity model for the record pair under test
//!
//! A [`Head`] owns exactly one [`Segment`]. Writers always move both values
//! together, so every committed state satisfies `head.value == segment.value`.
//! A [`PairView`] is what a read strategy observed; it is never persisted.

use serde::{Deserialize, Serialize};

/// Store-assigned head identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HeadId(pub u64);

impl std::fmt::Display for HeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned segment identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary record, addressed by its unique `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Head {
    /// Identity
    pub id: HeadId,
    /// Unique logical key
    pub name: String,
    /// Mutated value
    pub value: i64,
}

/// Dependent record, one per head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Identity
    pub id: SegmentId,
    /// Mirrors the owning head's value at every committed state
    pub value: i64,
    /// Owning head
    pub head_id: HeadId,
}

/// Head together with whatever segment the reader saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairView {
    pub head: Head,
    pub segment: Option<Segment>,
}

impl PairView {
    /// Compose a view from two separately fetched records
    #[inline]
    #[must_use]
    pub fn new(head: Head, segment: Option<Segment>) -> Self {
        Self { head, segment }
    }

    /// Segment value, if a segment was observed
    #[inline]
    #[must_use]
    pub fn segment_value(&self) -> Option<i64> {
        self.segment.as_ref().map(|s| s.value)
    }

    /// True when the view satisfies the pair invariant
    #[inline]
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.segment_value() == Some(self.head.value)
    }
}

/// One flattened row of the raw head/segment join
///
/// Column layout mirrors `SELECT h.*, s.id, s.value, s.head_id FROM heads h
/// JOIN segments s ON h.id = s.head_id WHERE h.name = $1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedRow {
    pub id: HeadId,
    pub name: String,
    pub value: i64,
    pub segment_id: SegmentId,
    pub segment_value: i64,
    pub head_id: HeadId,
}

impl From<JoinedRow> for PairView {
    fn from(row: JoinedRow) -> Self {
        Self {
            head: Head {
                id: row.id,
                name: row.name,
                value: row.value,
            },
            segment: Some(Segment {
                id: row.segment_id,
                value: row.segment_value,
                head_id: row.head_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(value: i64) -> Head {
        Head {
            id: HeadId(1),
            name: "Python".to_string(),
            value,
        }
    }

    fn segment(value: i64) -> Segment {
        Segment {
            id: SegmentId(7),
            value,
            head_id: HeadId(1),
        }
    }

    #[test]
    fn matching_values_are_consistent() {
        assert!(PairView::new(head(5), Some(segment(5))).is_consistent());
    }

    #[test]
    fn diverging_or_missing_segment_is_inconsistent() {
        assert!(!PairView::new(head(5), Some(segment(4))).is_consistent());
        assert!(!PairView::new(head(5), None).is_consistent());
    }

    #[test]
    fn joined_row_reconstructs_both_records() {
        let row = JoinedRow {
            id: HeadId(1),
            name: "Python".to_string(),
            value: 12,
            segment_id: SegmentId(7),
            segment_value: 12,
            head_id: HeadId(1),
        };

        let view = PairView::from(row);
        assert_eq!(view.head, head(12));
        assert_eq!(view.segment, Some(segment(12)));
    }
}
