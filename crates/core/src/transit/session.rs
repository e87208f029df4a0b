//! Client session state.
//!
//! A `Session` owns the loaded datasets and the user's preferences. Every
//! user action is a method here; methods that change a preference persist it
//! before returning.

use super::models::{Datasets, Route};
use super::preferences::{Favorite, Language, Preferences, Theme};
use super::search::{SearchError, find_routes};
use crate::{CacheDb, Error};

pub struct Session {
    db: CacheDb,
    datasets: Datasets,
    prefs: Preferences,
}

impl Session {
    /// Start a session, reading preferences from storage.
    pub async fn start(db: CacheDb, datasets: Datasets) -> Result<Self, Error> {
        let prefs = Preferences::load(&db).await?;
        tracing::debug!(
            lang = %prefs.lang,
            theme = %prefs.theme,
            favorites = prefs.favorites.len(),
            routes = datasets.routes.len(),
            "session started"
        );
        Ok(Self { db, datasets, prefs })
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    /// Routes between two neighborhoods, fastest first.
    pub fn search(&self, origin: &str, destination: &str) -> Result<Vec<&Route>, SearchError> {
        find_routes(&self.datasets.routes, origin, destination)
    }

    /// Bookmark a route. Returns false if it was already a favorite.
    pub async fn save_favorite(&mut self, id: &str, origin: &str, destination: &str) -> Result<bool, Error> {
        let added = self.prefs.add_favorite(Favorite {
            id: id.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
        });
        if added {
            self.prefs.save_favorites(&self.db).await?;
        }
        Ok(added)
    }

    /// Bookmark a route from the dataset by id.
    pub async fn save_route(&mut self, route_id: &str) -> Result<bool, Error> {
        let (origin, destination) = match self.datasets.route(route_id) {
            Some(route) => (route.origin.clone(), route.destination.clone()),
            None => return Err(Error::InvalidInput(format!("unknown route: {route_id}"))),
        };
        self.save_favorite(route_id, &origin, &destination).await
    }

    /// Returns false if no favorite had that id.
    pub async fn remove_favorite(&mut self, id: &str) -> Result<bool, Error> {
        let removed = self.prefs.remove_favorite(id);
        if removed {
            self.prefs.save_favorites(&self.db).await?;
        }
        Ok(removed)
    }

    pub async fn toggle_lang(&mut self) -> Result<Language, Error> {
        self.prefs.lang = self.prefs.lang.toggled();
        self.prefs.save_lang(&self.db).await?;
        tracing::info!(lang = %self.prefs.lang, "language applied");
        Ok(self.prefs.lang)
    }

    pub async fn toggle_theme(&mut self) -> Result<Theme, Error> {
        self.prefs.theme = self.prefs.theme.toggled();
        self.prefs.save_theme(&self.db).await?;
        Ok(self.prefs.theme)
    }

    /// Flip data-saving mode and return the localized confirmation.
    pub async fn toggle_low_data(&mut self) -> Result<String, Error> {
        self.prefs.low_data = !self.prefs.low_data;
        self.prefs.save_low_data(&self.db).await?;
        let key = if self.prefs.low_data { "lowData_on" } else { "lowData_off" };
        Ok(self.translate(key))
    }

    /// Localized string for `key` in the current language, or the key itself.
    pub fn translate(&self, key: &str) -> String {
        self.datasets
            .dictionary
            .get(self.prefs.lang.code(), key)
            .unwrap_or(key)
            .to_string()
    }
}
