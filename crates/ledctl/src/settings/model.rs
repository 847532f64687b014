use std::fmt;

use serde::de::IgnoredAny;
use serde::de::MapAccess;
use serde::de::Visitor;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use strum::AsRefStr;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoEnumIterator;

/// Display name used until the user saves one.
pub const DEFAULT_DEVICE_NAME: &str = "Akıllı LED";

/// Durable user settings.
///
/// Stored as a flat object keyed by `SettingsKey`. Every field falls back to its default when the
/// key is missing, so a document written by an older build (or a hand-edited one) still loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Webhook invoked by the "turn on" command.
    pub url_on: String,

    /// Webhook invoked by the "turn off" command.
    pub url_off: String,

    /// Human-readable name of the controlled device.
    pub device_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url_on: String::new(),
            url_off: String::new(),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

impl Settings {
    pub fn new(
        url_on: impl Into<String>,
        url_off: impl Into<String>,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            url_on: url_on.into(),
            url_off: url_off.into(),
            device_name: device_name.into(),
        }
    }

    pub fn get(&self, key: SettingsKey) -> &str {
        match key {
            SettingsKey::UrlOn => &self.url_on,
            SettingsKey::UrlOff => &self.url_off,
            SettingsKey::DeviceName => &self.device_name,
        }
    }

    pub fn set(&mut self, key: SettingsKey, value: String) {
        match key {
            SettingsKey::UrlOn => self.url_on = value,
            SettingsKey::UrlOff => self.url_off = value,
            SettingsKey::DeviceName => self.device_name = value,
        }
    }
}

/// The fixed set of persisted keys. The string form is the on-disk key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
pub enum SettingsKey {
    #[strum(serialize = "webhook_url_on")]
    UrlOn,
    #[strum(serialize = "webhook_url_off")]
    UrlOff,
    #[strum(serialize = "device_name")]
    DeviceName,
}

impl Serialize for Settings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(SettingsKey::iter().map(|key| (key.to_string(), self.get(key))))
    }
}

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SettingsVisitor)
    }
}

struct SettingsVisitor;

impl<'de> Visitor<'de> for SettingsVisitor {
    type Value = Settings;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a settings object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Settings, A::Error> {
        let mut settings = Settings::default();
        while let Some(name) = map.next_key::<String>()? {
            match name.parse::<SettingsKey>() {
                Ok(key) => settings.set(key, map.next_value()?),
                Err(_) => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.url_on, "");
        assert_eq!(settings.url_off, "");
        assert_eq!(settings.device_name, "Akıllı LED");
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"webhook_url_on": "http://lamp/on"}"#).unwrap();
        assert_eq!(settings.url_on, "http://lamp/on");
        assert_eq!(settings.url_off, "");
        assert_eq!(settings.device_name, DEFAULT_DEVICE_NAME);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let settings: Settings =
            serde_json::from_str(r#"{"device_name": "Desk", "brightness": 40}"#).unwrap();
        assert_eq!(settings.device_name, "Desk");
    }

    #[test]
    fn test_serialized_layout() {
        let value = serde_json::to_value(Settings::new("http://a", "http://b", "Lamp")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "webhook_url_on": "http://a",
                "webhook_url_off": "http://b",
                "device_name": "Lamp",
            })
        );
    }

    #[test]
    fn test_key_parses_from_on_disk_name() {
        for key in SettingsKey::iter() {
            assert_eq!(key.to_string().parse::<SettingsKey>(), Ok(key));
        }
        assert!("led_name".parse::<SettingsKey>().is_err());
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(serde_json::from_str::<Settings>(r#"["a", "b"]"#).is_err());
    }

    #[test]
    fn test_get_and_set_by_key() {
        let mut settings = Settings::default();
        settings.set(SettingsKey::UrlOff, "http://lamp/off".to_string());
        assert_eq!(settings.get(SettingsKey::UrlOff), "http://lamp/off");
        assert_eq!(settings.get(SettingsKey::DeviceName), DEFAULT_DEVICE_NAME);
    }
}
