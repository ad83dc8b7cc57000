/// A compact URI of the form `prefix:localpart`.
///
/// `Curie` borrows nothing; it's a thin parsing helper over `&str` /
/// `String`, not a separate owned type, since the vast majority of the
/// pipeline just treats ids as `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Curie<'a> {
    pub prefix: &'a str,
    pub localpart: &'a str,
}

impl<'a> Curie<'a> {
    pub fn parse(id: &'a str) -> Option<Self> {
        let (prefix, localpart) = id.split_once(':')?;
        if prefix.is_empty() || localpart.is_empty() {
            return None;
        }
        Some(Curie { prefix, localpart })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_and_localpart() {
        let c = Curie::parse("MONDO:0005148").unwrap();
        assert_eq!(c.prefix, "MONDO");
        assert_eq!(c.localpart, "0005148");
    }

    #[test]
    fn rejects_missing_colon() {
        assert!(Curie::parse("not-a-curie").is_none());
    }

    #[test]
    fn rejects_empty_prefix_or_localpart() {
        assert!(Curie::parse(":0005148").is_none());
        assert!(Curie::parse("MONDO:").is_none());
    }
}
