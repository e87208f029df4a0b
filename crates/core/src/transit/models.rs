//! Static dataset records.
//!
//! The published JSON files use Spanish field names (`origen`, `destino`,
//! `tipo`, `tiempo`, `costo`, `mensaje`); English names are accepted too.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub const NEIGHBORHOODS_PATH: &str = "data/barrios.json";
pub const ROUTES_PATH: &str = "data/rutas.json";
pub const ALERTS_PATH: &str = "data/alerts.json";
pub const DICTIONARY_PATH: &str = "data/i18n.json";

/// A pre-computed route between two neighborhoods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "origen", alias = "origin")]
    pub origin: String,
    #[serde(rename = "destino", alias = "destination")]
    pub destination: String,
    /// Transport mode label, e.g. "Guagua" or "Metro".
    #[serde(rename = "tipo", alias = "mode")]
    pub mode: String,
    /// Minutes.
    #[serde(rename = "tiempo", alias = "duration")]
    pub duration: u32,
    /// Fare in RD$.
    #[serde(rename = "costo", alias = "cost")]
    pub cost: f64,
}

/// A service alert shown on the start screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// "Info", "Aviso", "Error", ...
    #[serde(rename = "tipo", alias = "severity")]
    pub severity: String,
    #[serde(rename = "mensaje", alias = "message")]
    pub message: String,
}

impl Alert {
    /// Lowercased severity, used as a style class.
    pub fn severity_class(&self) -> String {
        self.severity.to_lowercase()
    }
}

/// Two-level translation table: language code → key → string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dictionary(HashMap<String, HashMap<String, String>>);

impl Dictionary {
    pub fn get(&self, lang: &str, key: &str) -> Option<&str> {
        self.0.get(lang)?.get(key).map(String::as_str)
    }

    pub fn has_language(&self, lang: &str) -> bool {
        self.0.contains_key(lang)
    }

    /// Language codes, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.0.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }
}

impl From<HashMap<String, HashMap<String, String>>> for Dictionary {
    fn from(map: HashMap<String, HashMap<String, String>>) -> Self {
        Self(map)
    }
}

/// Everything the client loads at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    pub neighborhoods: Vec<String>,
    pub routes: Vec<Route>,
    pub alerts: Vec<Alert>,
    pub dictionary: Dictionary,
}

impl Datasets {
    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}
