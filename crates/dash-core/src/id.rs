use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A widget identifier.
///
/// Owns its text behind an `Arc`, so clones are a reference-count bump and
/// the storage goes away with the last result that holds it. Nothing is
/// kept between parse calls.
/// Serializes as the plain id string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(Arc<str>);

impl WidgetId {
    pub fn new(s: &str) -> Self {
        WidgetId(Arc::from(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WidgetId {
    fn from(s: &str) -> Self {
        WidgetId::new(s)
    }
}

impl From<String> for WidgetId {
    fn from(s: String) -> Self {
        WidgetId(Arc::from(s))
    }
}

impl fmt::Debug for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<&str> for WidgetId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<str> for WidgetId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl Serialize for WidgetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WidgetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(WidgetId::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_text() {
        let a = WidgetId::new("kpi_revenue");
        let b = WidgetId::from("kpi_revenue".to_string());
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "kpi_revenue");
        assert_eq!(a, "kpi_revenue");
        assert_eq!(format!("{a:?}"), "#kpi_revenue");
    }

    #[test]
    fn storage_is_released_with_its_owners() {
        let id = WidgetId::new("c1");
        let copy = id.clone();
        assert_eq!(Arc::strong_count(&id.0), 2);
        drop(copy);
        assert_eq!(Arc::strong_count(&id.0), 1);
    }

    #[test]
    fn separate_parses_share_nothing() {
        let first = crate::parse(r#"<dashboard layout-mode="grid"><kpi id="r"/></dashboard>"#);
        let second = crate::parse(r#"<dashboard layout-mode="grid"><kpi id="r"/></dashboard>"#);
        let (a, b) = (&first.widgets[0].id, &second.widgets[0].id);
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(Arc::strong_count(&a.0), 1);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = WidgetId::new("c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c1\"");
        let back: WidgetId = serde_json::from_str("\"c1\"").unwrap();
        assert_eq!(back, id);
    }
}
