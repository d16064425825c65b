//! Registry of raw escape sequences bound to editor actions.
//!
//! The backend forgets registrations whenever it is torn down, so the screen
//! keeps its own copy and replays it on every (re)initialization.

/// Distinct sequences in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSequenceSet {
    seqs: Vec<String>,
}

impl RawSequenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `seq`. Returns `false` (and changes nothing) if it is already present.
    pub fn insert(&mut self, seq: &str) -> bool {
        if self.contains(seq) {
            return false;
        }
        self.seqs.push(seq.to_string());
        true
    }

    /// Removes `seq` by swapping the last entry into its place.
    /// Returns whether it was present.
    pub fn remove(&mut self, seq: &str) -> bool {
        match self.seqs.iter().position(|existing| existing == seq) {
            Some(index) => {
                self.seqs.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, seq: &str) -> bool {
        self.seqs.iter().any(|existing| existing == seq)
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.seqs.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.seqs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::RawSequenceSet;

    #[test]
    fn insert_rejects_duplicates() {
        let mut set = RawSequenceSet::new();
        assert!(set.insert("\x1b[1;5A"));
        assert!(!set.insert("\x1b[1;5A"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_swaps_last_into_place() {
        let mut set = RawSequenceSet::new();
        for seq in ["a", "b", "c", "d"] {
            set.insert(seq);
        }
        assert!(set.remove("b"));
        assert_eq!(set.to_vec(), vec!["a", "d", "c"]);
        assert!(!set.contains("b"));
    }

    #[test]
    fn removing_absent_sequence_is_a_no_op() {
        let mut set = RawSequenceSet::new();
        set.insert("a");
        assert!(!set.remove("zz"));
        assert_eq!(set.to_vec(), vec!["a"]);

        let mut empty = RawSequenceSet::new();
        assert!(!empty.remove("a"));
        assert!(empty.is_empty());
    }

    #[test]
    fn preserves_insertion_order() {
        let mut set = RawSequenceSet::new();
        set.insert("\x1b[1;5B");
        set.insert("\x1b[1;5A");
        let seqs: Vec<&str> = set.iter().collect();
        assert_eq!(seqs, vec!["\x1b[1;5B", "\x1b[1;5A"]);
    }
}
