use serde::{Deserialize, Serialize};

/// Outcome of a single classification stage.
///
/// `Unknown` means "no decision could be made here" and is only ever a
/// transient value: it is never persisted and never appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Block,
    Unknown,
}

/// The only verdicts the cache is allowed to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredVerdict {
    #[serde(rename = "SAFE")]
    Safe,
    #[serde(rename = "BLOCK")]
    Block,
}

impl From<StoredVerdict> for Verdict {
    fn from(v: StoredVerdict) -> Self {
        match v {
            StoredVerdict::Safe => Verdict::Safe,
            StoredVerdict::Block => Verdict::Block,
        }
    }
}

impl Verdict {
    /// Converts to a persistable verdict. `Unknown` has no stored form.
    pub fn to_stored(self) -> Option<StoredVerdict> {
        match self {
            Verdict::Safe => Some(StoredVerdict::Safe),
            Verdict::Block => Some(StoredVerdict::Block),
            Verdict::Unknown => None,
        }
    }
}

impl StoredVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredVerdict::Safe => "SAFE",
            StoredVerdict::Block => "BLOCK",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_has_no_stored_form() {
        assert_eq!(Verdict::Unknown.to_stored(), None);
        assert_eq!(Verdict::Safe.to_stored(), Some(StoredVerdict::Safe));
        assert_eq!(Verdict::Block.to_stored(), Some(StoredVerdict::Block));
    }

    #[test]
    fn test_wire_form() {
        assert_eq!(
            serde_json::to_string(&StoredVerdict::Block).unwrap(),
            "\"BLOCK\""
        );
        let v: StoredVerdict = serde_json::from_str("\"SAFE\"").unwrap();
        assert_eq!(v, StoredVerdict::Safe);
    }
}
