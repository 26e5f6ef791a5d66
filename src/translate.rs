// Locale handling for labels and the host's status texts

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const FALLBACK_LOCALES: [&str; 2] = ["nl", "en"];
const MISSING_TRANSLATION: &str = "[missing translation]";

/// A label that is either literal text or a map from locale to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Translatable(BTreeMap<String, String>),
}

impl Label {
    pub fn translate(&self, locale: &str) -> String {
        match self {
            Label::Text(s) => s.clone(),
            Label::Translatable(map) => std::iter::once(locale)
                .chain(FALLBACK_LOCALES)
                .find_map(|l| map.get(l))
                .cloned()
                .unwrap_or_else(|| MISSING_TRANSLATION.to_string()),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessage {
    /// The request produced an error response.
    Error,
    /// The request succeeded but there is nothing to draw.
    NoData,
}

pub fn status_message(kind: StatusMessage, locale: &str) -> String {
    let texts: &[(&str, &str)] = match kind {
        StatusMessage::Error => &[("en", "Could not create visualization"), ("nl", "Kon visualisatie niet maken")],
        StatusMessage::NoData => &[("en", "No data"), ("nl", "Geen data")],
    };
    let map = texts
        .iter()
        .map(|(l, t)| (l.to_string(), t.to_string()))
        .collect();
    Label::Translatable(map).translate(locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translatable(pairs: &[(&str, &str)]) -> Label {
        Label::Translatable(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_plain_text_ignores_locale() {
        assert_eq!(Label::from("Amount").translate("de"), "Amount");
    }

    #[test]
    fn test_fallback_order() {
        let label = translatable(&[("en", "Month"), ("nl", "Maand")]);
        assert_eq!(label.translate("en"), "Month");
        assert_eq!(label.translate("de"), "Maand");
        assert_eq!(translatable(&[("en", "Month")]).translate("de"), "Month");
        assert_eq!(translatable(&[("fr", "Mois")]).translate("de"), MISSING_TRANSLATION);
    }

    #[test]
    fn test_untagged_deserialize() {
        let text: Label = serde_json::from_str("\"Date\"").unwrap();
        assert_eq!(text, Label::from("Date"));
        let map: Label = serde_json::from_str(r#"{"en": "Date", "nl": "Datum"}"#).unwrap();
        assert_eq!(map.translate("nl"), "Datum");
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(status_message(StatusMessage::Error, "en"), "Could not create visualization");
        assert_eq!(status_message(StatusMessage::NoData, "nl"), "Geen data");
        assert_eq!(status_message(StatusMessage::NoData, "de"), "Geen data");
    }
}
