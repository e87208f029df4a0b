use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::json;

use rutas_client::{CacheController, FetchClient, FetchConfig, Network, WorkerState, load_datasets};
use rutas_core::transit::{Alert, Favorite, Route, Session};
use rutas_core::{AppConfig, CacheDb};

use crate::cli::{Commands, FavoritesAction};

pub struct CommandExecutor {
    config: AppConfig,
    controller: CacheController,
    json: bool,
}

impl CommandExecutor {
    pub async fn new(config: AppConfig, json: bool) -> Result<Self> {
        let db = CacheDb::open(&config.db_path)
            .await
            .with_context(|| format!("failed to open {}", config.db_path.display()))?;
        let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
        let controller = CacheController::from_config(db, network, &config)?;
        Ok(Self { config, controller, json })
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        let result = match command {
            Commands::Install => self.install().await,
            Commands::Activate => self.activate().await,
            Commands::Status => self.status().await,
            Commands::Fetch { path } => self.fetch(&path).await,
            Commands::Neighborhoods => self.neighborhoods().await,
            Commands::Alerts => self.alerts().await,
            Commands::Search { origin, destination } => self.search(&origin, &destination).await,
            Commands::Favorites { action } => self.favorites(action.unwrap_or(FavoritesAction::List)).await,
            Commands::Lang => self.toggle_lang().await,
            Commands::Theme => self.toggle_theme().await,
            Commands::LowData => self.toggle_low_data().await,
        };
        self.controller.wait_until_idle().await;
        result
    }

    async fn install(&self) -> Result<()> {
        let written = self.controller.install().await?;
        if self.config.skip_waiting {
            self.controller.activate().await?;
        }
        let state = self.controller.state().await;

        if self.json {
            println!("{}", json!({ "version": self.controller.version(), "assets": written, "state": state }));
        } else {
            println!("installed {} ({} assets), {}", self.controller.version(), written, state);
            if state == WorkerState::Installed {
                println!("run `rutas activate` to remove older generations");
            }
        }
        Ok(())
    }

    async fn activate(&self) -> Result<()> {
        let before = self.controller.db().list_generations().await?;
        let status = self.controller.register().await?;
        if status.state != WorkerState::Active {
            self.controller.activate().await?;
        }
        let after = self.controller.db().list_generations().await?;
        let removed = removed_generations(&before, &after, self.controller.version());
        let status = self.controller.status().await?;

        if self.json {
            println!("{}", serde_json::to_string(&status)?);
        } else {
            println!("active: {} (removed {} old generations)", status.version, removed);
        }
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        let generations = self.controller.db().generation_info().await?;
        let current = self.controller.version();

        if self.json {
            println!("{}", json!({ "version": current, "generations": generations }));
            return Ok(());
        }

        println!("version: {current}");
        if generations.is_empty() {
            println!("no cache generations stored");
        }
        for generation in &generations {
            let marker = if generation.version == current { "*" } else { " " };
            println!(
                "{marker} {}  {} entries  created {}",
                generation.version, generation.entries, generation.created_at
            );
        }
        Ok(())
    }

    async fn fetch(&self, path: &str) -> Result<()> {
        self.start().await;
        let identity = self.controller.manifest().identity_for(path)?;
        let outcome = self.controller.handle_fetch(&identity).await?;

        eprintln!("{} {} ({})", outcome.response.status, identity.url(), outcome.source.as_str());
        println!("{}", String::from_utf8_lossy(&outcome.response.body));
        Ok(())
    }

    async fn neighborhoods(&self) -> Result<()> {
        let session = self.session().await?;
        let neighborhoods = &session.datasets().neighborhoods;

        if self.json {
            println!("{}", serde_json::to_string(neighborhoods)?);
        } else {
            for name in neighborhoods {
                println!("{name}");
            }
        }
        Ok(())
    }

    async fn alerts(&self) -> Result<()> {
        let session = self.session().await?;
        let alerts = &session.datasets().alerts;

        if self.json {
            println!("{}", serde_json::to_string(alerts)?);
        } else if alerts.is_empty() {
            println!("{}", localized(&session, "no_alerts", "No hay alertas activas."));
        } else {
            for alert in alerts {
                println!("{}", format_alert(alert));
            }
        }
        Ok(())
    }

    async fn search(&self, origin: &str, destination: &str) -> Result<()> {
        let session = self.session().await?;
        let routes = match session.search(origin, destination) {
            Ok(routes) => routes,
            Err(e) => bail!(localized(&session, e.message_key(), &e.to_string())),
        };

        if self.json {
            println!("{}", serde_json::to_string(&routes)?);
        } else if routes.is_empty() {
            println!("{} {} ➜ {}", localized(&session, "no_routes", "No se encontraron rutas:"), origin, destination);
        } else {
            for route in routes {
                println!("{}", format_route(route, session.prefs().is_favorite(&route.id)));
            }
        }
        Ok(())
    }

    async fn favorites(&self, action: FavoritesAction) -> Result<()> {
        let mut session = self.session().await?;

        match action {
            FavoritesAction::List => {}
            FavoritesAction::Add { route_id } => {
                if !session.save_route(&route_id).await? {
                    tracing::info!(route = %route_id, "already a favorite");
                }
            }
            FavoritesAction::Remove { id } => {
                if !session.remove_favorite(&id).await? {
                    bail!("no favorite with id {id}");
                }
            }
        }

        let favorites = &session.prefs().favorites;
        if self.json {
            println!("{}", serde_json::to_string(favorites)?);
        } else if favorites.is_empty() {
            println!("{}", localized(&session, "no_favs", "(sin favoritas)"));
        } else {
            for favorite in favorites {
                println!("{}", format_favorite(favorite));
            }
        }
        Ok(())
    }

    async fn toggle_lang(&self) -> Result<()> {
        let mut session = self.session().await?;
        let lang = session.toggle_lang().await?;
        println!("{}", lang.code().to_uppercase());
        Ok(())
    }

    async fn toggle_theme(&self) -> Result<()> {
        let mut session = self.session().await?;
        println!("{}", session.toggle_theme().await?);
        Ok(())
    }

    async fn toggle_low_data(&self) -> Result<()> {
        let mut session = self.session().await?;
        println!("{}", session.toggle_low_data().await?);
        Ok(())
    }

    /// Register the controller. A failed install leaves it in pass-through.
    async fn start(&self) {
        if let Err(e) = self.controller.register().await {
            tracing::warn!(error = %e, "cache install failed; continuing without cache");
        }
    }

    async fn session(&self) -> Result<Session> {
        self.start().await;
        let datasets = load_datasets(&self.controller).await.context("failed to load datasets")?;
        Ok(Session::start(self.controller.db().clone(), datasets).await?)
    }
}

/// Stale generations present in `before` that are gone from `after`.
fn removed_generations(before: &[String], after: &[String], current: &str) -> usize {
    before
        .iter()
        .filter(|version| version.as_str() != current && !after.contains(version))
        .count()
}

/// Dictionary text for `key`, or `fallback` when the key is not translated.
fn localized(session: &Session, key: &str, fallback: &str) -> String {
    let text = session.translate(key);
    if text == key { fallback.to_string() } else { text }
}

fn format_route(route: &Route, favorite: bool) -> String {
    let star = if favorite { "★" } else { " " };
    format!(
        "{star} [{}] {:<14} {:>3} min  {:>7.2} RD$",
        route.id, route.mode, route.duration, route.cost
    )
}

fn format_alert(alert: &Alert) -> String {
    format!("[{}] {}: {}", alert.severity_class(), alert.severity, alert.message)
}

fn format_favorite(favorite: &Favorite) -> String {
    format!("[{}] {} ➜ {}", favorite.id, favorite.origin, favorite.destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(favorite_id: &str) -> Route {
        Route {
            id: favorite_id.to_string(),
            origin: "Gazcue".into(),
            destination: "Piantini".into(),
            mode: "Guagua".into(),
            duration: 25,
            cost: 35.0,
        }
    }

    #[test]
    fn test_format_route() {
        let line = format_route(&route("3"), false);
        assert!(line.starts_with("  [3] Guagua"));
        assert!(line.contains(" 25 min"));
        assert!(line.ends_with("35.00 RD$"));
    }

    #[test]
    fn test_format_route_marks_favorite() {
        assert!(format_route(&route("3"), true).starts_with('★'));
    }

    #[test]
    fn test_removed_generations_counts_stale_only() {
        let before = vec!["v1".to_string(), "v2".to_string(), "v3".to_string()];
        let after = vec!["v3".to_string()];
        assert_eq!(removed_generations(&before, &after, "v3"), 2);
    }

    #[test]
    fn test_removed_generations_after_fresh_install() {
        let before = vec!["v1".to_string()];
        let after = vec!["v2".to_string()];
        assert_eq!(removed_generations(&before, &after, "v2"), 1);
        assert_eq!(removed_generations(&[], &after, "v2"), 0);
    }

    #[test]
    fn test_removed_generations_failed_delete_not_counted() {
        let before = vec!["v1".to_string(), "v2".to_string()];
        assert_eq!(removed_generations(&before, &before, "v2"), 0);
    }

    #[test]
    fn test_format_alert() {
        let alert = Alert { severity: "Aviso".into(), message: "Desvío en la Kennedy".into() };
        assert_eq!(format_alert(&alert), "[aviso] Aviso: Desvío en la Kennedy");
    }

    #[test]
    fn test_format_favorite() {
        let favorite = Favorite { id: "9".into(), origin: "Gazcue".into(), destination: "Los Mina".into() };
        assert_eq!(format_favorite(&favorite), "[9] Gazcue ➜ Los Mina");
    }
}
