//! Citation attached to an answer.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Plain(String),
    Linked { text: String, link: String },
}

impl Source {
    /// Builds a `Linked` source when a non-empty link is available.
    pub fn new(text: impl Into<String>, link: Option<String>) -> Self {
        let text = text.into();
        match link.filter(|l| !l.trim().is_empty()) {
            Some(link) => Source::Linked { text, link },
            None => Source::Plain(text),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Source::Plain(text) | Source::Linked { text, .. } => text,
        }
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            Source::Plain(_) => None,
            Source::Linked { link, .. } => Some(link),
        }
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("text", self.text())?;
        if let Some(link) = self.link() {
            map.serialize_entry("link", link)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceRepr {
    Bare(String),
    Object {
        text: String,
        #[serde(default)]
        link: Option<String>,
    },
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match SourceRepr::deserialize(deserializer) {
            Ok(SourceRepr::Bare(text)) => Ok(Source::Plain(text)),
            Ok(SourceRepr::Object { text, link }) => Ok(Source::new(text, link)),
            Err(_) => Err(de::Error::custom(
                "source must be a string or an object with `text` and optional `link`",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_form_omits_missing_link() {
        assert_eq!(
            serde_json::to_value(Source::Plain("Course A - Lesson 1".into())).unwrap(),
            json!({"text": "Course A - Lesson 1"})
        );
        assert_eq!(
            serde_json::to_value(Source::new("Course A", Some("https://a".into()))).unwrap(),
            json!({"text": "Course A", "link": "https://a"})
        );
    }

    #[test]
    fn accepts_bare_strings_and_objects() {
        let sources: Vec<Source> = serde_json::from_value(json!([
            "legacy",
            {"text": "plain"},
            {"text": "linked", "link": "https://l"},
            {"text": "blank", "link": ""},
            {"text": "null", "link": null}
        ]))
        .unwrap();

        assert_eq!(
            sources,
            vec![
                Source::Plain("legacy".into()),
                Source::Plain("plain".into()),
                Source::Linked {
                    text: "linked".into(),
                    link: "https://l".into()
                },
                Source::Plain("blank".into()),
                Source::Plain("null".into()),
            ]
        );
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(serde_json::from_value::<Source>(json!(42)).is_err());
        assert!(serde_json::from_value::<Source>(json!({"link": "x"})).is_err());
    }
}
