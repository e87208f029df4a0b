//! Persisted user preferences and favorite routes.
//!
//! Preferences are read once when a session starts and written back on every
//! change, one key per setting.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CacheDb, Error};

pub const LANG_KEY: &str = "lang";
pub const THEME_KEY: &str = "theme";
pub const LOW_DATA_KEY: &str = "lowData";
pub const FAVORITES_KEY: &str = "favs";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" => Some(Language::Es),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::Es => Language::En,
            Language::En => Language::Es,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Anything other than "dark" reads as light.
    pub fn from_stored(value: &str) -> Self {
        if value == "dark" { Theme::Dark } else { Theme::Light }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookmarked route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    #[serde(rename = "origen", alias = "origin")]
    pub origin: String,
    #[serde(rename = "destino", alias = "destination")]
    pub destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub lang: Language,
    pub theme: Theme,
    pub low_data: bool,
    pub favorites: Vec<Favorite>,
}

impl Preferences {
    /// Read every preference from storage.
    ///
    /// Missing or unreadable values fall back to their defaults; only storage
    /// errors are returned.
    pub async fn load(db: &CacheDb) -> Result<Self, Error> {
        let lang = db
            .get_pref(LANG_KEY)
            .await?
            .and_then(|v| Language::from_code(&v))
            .unwrap_or_default();
        let theme = db
            .get_pref(THEME_KEY)
            .await?
            .map(|v| Theme::from_stored(&v))
            .unwrap_or_default();
        let low_data = db.get_pref(LOW_DATA_KEY).await?.is_some_and(|v| v == "true");

        let favorites = match db.get_pref(FAVORITES_KEY).await? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "discarding unreadable favorites");
                Vec::new()
            }),
            None => Vec::new(),
        };

        Ok(Self { lang, theme, low_data, favorites })
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|f| f.id == id)
    }

    /// Adds the favorite unless one with the same id exists.
    pub fn add_favorite(&mut self, favorite: Favorite) -> bool {
        if self.is_favorite(&favorite.id) {
            return false;
        }
        self.favorites.push(favorite);
        true
    }

    pub fn remove_favorite(&mut self, id: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|f| f.id != id);
        self.favorites.len() != before
    }

    pub async fn save_lang(&self, db: &CacheDb) -> Result<(), Error> {
        db.set_pref(LANG_KEY, self.lang.code()).await
    }

    pub async fn save_theme(&self, db: &CacheDb) -> Result<(), Error> {
        db.set_pref(THEME_KEY, self.theme.as_str()).await
    }

    pub async fn save_low_data(&self, db: &CacheDb) -> Result<(), Error> {
        db.set_pref(LOW_DATA_KEY, if self.low_data { "true" } else { "false" })
            .await
    }

    pub async fn save_favorites(&self, db: &CacheDb) -> Result<(), Error> {
        let json = serde_json::to_string(&self.favorites)?;
        db.set_pref(FAVORITES_KEY, &json).await
    }
}
