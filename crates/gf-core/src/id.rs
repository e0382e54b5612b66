use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Interner shared by every `LayerId` in the process.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Opaque identifier of a layer in a design document.
///
/// Host ids are colon-separated numbers (`"12:345"`); layers inside a
/// component instance chain them with `;` (`"I12:3;4:5"`). Interned, so it
/// is `Copy` and compares in O(1). The string form is the one stored in
/// field→layer pairs and typed on the command line.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(Spur);

impl LayerId {
    /// Intern a host identifier, or return the existing one.
    pub fn intern(s: &str) -> Self {
        LayerId(INTERNER.get_or_intern(s))
    }

    /// Validate user-typed text as a layer id. Surrounding whitespace is
    /// dropped; the id itself may not be empty or contain whitespace, `,`,
    /// `|` or quotes, since those separate ids and pair options.
    pub fn parse(text: &str) -> Result<Self, String> {
        let id = text.trim();
        if id.is_empty() {
            return Err("Empty layer id".to_string());
        }
        if let Some(c) = id
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, ',' | '|' | '"'))
        {
            return Err(format!("Invalid character {c:?} in layer id `{id}`"));
        }
        Ok(Self::intern(id))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Allocate a fresh identifier shaped like a host id, `"{prefix}:{n}"`.
    ///
    /// Used by documents built in code and by snapshots that omit ids. A
    /// non-numeric prefix keeps these apart from ids the host assigned, and
    /// the result always passes [`LayerId::parse`].
    pub fn generate(prefix: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}:{n}"))
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self.as_str())
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        LayerId::intern(s)
    }
}

impl Serialize for LayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(LayerId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = LayerId::intern("12:345");
        let b = LayerId::intern("12:345");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "12:345");
        assert_eq!(a.to_string(), "12:345");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = LayerId::generate("gen");
        let b = LayerId::generate("gen");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("gen:"));
    }

    #[test]
    fn parse_accepts_host_ids_and_rejects_separators() {
        assert_eq!(LayerId::parse(" 12:345 "), Ok(LayerId::intern("12:345")));
        assert_eq!("I12:3;4:5".parse::<LayerId>(), Ok(LayerId::intern("I12:3;4:5")));
        assert!(LayerId::parse("").is_err());
        assert!(LayerId::parse("   ").is_err());
        assert!(LayerId::parse("12:3,12:4").is_err());
        assert!(LayerId::parse("12: 3").is_err());
        assert!(LayerId::parse("12:3|upper").is_err());
    }

    #[test]
    fn generated_ids_parse_back() {
        let id = LayerId::generate("snap");
        let (prefix, n) = id.as_str().split_once(':').unwrap();
        assert_eq!(prefix, "snap");
        assert!(n.parse::<u64>().is_ok());
        assert_eq!(LayerId::parse(id.as_str()), Ok(id));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = LayerId::intern("1:2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1:2\"");
        let back: LayerId = serde_json::from_str("\"1:2\"").unwrap();
        assert_eq!(back, id);
    }
}
