//! Startup dataset loading.
//!
//! The four JSON files are requested in parallel through the cache
//! controller, so they come from the network when online and from the
//! current generation when not.

use serde::de::DeserializeOwned;

use rutas_core::Error;
use rutas_core::transit::models::{ALERTS_PATH, DICTIONARY_PATH, NEIGHBORHOODS_PATH, ROUTES_PATH};
use rutas_core::transit::{Alert, Datasets, Dictionary, Route};

use crate::worker::CacheController;

/// Fetch and parse every dataset. Fails if any one of them fails.
pub async fn load_datasets(controller: &CacheController) -> Result<Datasets, Error> {
    let (neighborhoods, routes, alerts, dictionary) = tokio::try_join!(
        load_json::<Vec<String>>(controller, NEIGHBORHOODS_PATH),
        load_json::<Vec<Route>>(controller, ROUTES_PATH),
        load_json::<Vec<Alert>>(controller, ALERTS_PATH),
        load_json::<Dictionary>(controller, DICTIONARY_PATH),
    )?;

    tracing::info!(
        neighborhoods = neighborhoods.len(),
        routes = routes.len(),
        alerts = alerts.len(),
        "datasets loaded"
    );

    Ok(Datasets { neighborhoods, routes, alerts, dictionary })
}

async fn load_json<T: DeserializeOwned>(controller: &CacheController, path: &str) -> Result<T, Error> {
    let identity = controller.manifest().identity_for(path)?;
    let outcome = controller.handle_fetch(&identity).await?;

    if !outcome.response.is_success() {
        return Err(Error::Dataset(format!("{path}: status {}", outcome.response.status)));
    }

    tracing::debug!(path, source = outcome.source.as_str(), bytes = outcome.response.body.len(), "dataset fetched");

    serde_json::from_slice(&outcome.response.body).map_err(|e| Error::Dataset(format!("{path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Network;
    use crate::stub::StubNetwork;
    use crate::worker::{AssetManifest, ControllerOptions};
    use rutas_core::CacheDb;
    use std::sync::Arc;

    const BARRIOS: &str = r#"["Gazcue", "Piantini", "Los Mina"]"#;
    const RUTAS: &str = r#"[
        {"id": 1, "origen": "Gazcue", "destino": "Piantini", "tipo": "Guagua", "tiempo": 25, "costo": 35},
        {"id": "2", "origen": "Gazcue", "destino": "Piantini", "tipo": "Carro público", "tiempo": 18, "costo": 50}
    ]"#;
    const ALERTS: &str = r#"[{"tipo": "Aviso", "mensaje": "Desvío en la 27 de Febrero"}]"#;
    const I18N: &str = r#"{"es": {"title": "Rutas"}, "en": {"title": "Routes"}}"#;

    fn serve_datasets(network: &StubNetwork) {
        let base = "http://localhost:8080/";
        network.serve(&format!("{base}{NEIGHBORHOODS_PATH}"), 200, BARRIOS);
        network.serve(&format!("{base}{ROUTES_PATH}"), 200, RUTAS);
        network.serve(&format!("{base}{ALERTS_PATH}"), 200, ALERTS);
        network.serve(&format!("{base}{DICTIONARY_PATH}"), 200, I18N);
    }

    async fn active_controller(network: &Arc<StubNetwork>) -> CacheController {
        let db = CacheDb::open_in_memory().await.unwrap();
        let assets = vec![
            "./data/barrios.json".to_string(),
            "./data/rutas.json".to_string(),
            "./data/alerts.json".to_string(),
            "./data/i18n.json".to_string(),
        ];
        let manifest = AssetManifest::new("http://localhost:8080/", assets).unwrap();
        let network: Arc<dyn Network> = network.clone();
        let ctrl = CacheController::new(db, network, manifest, "v1", ControllerOptions::default());
        ctrl.register().await.unwrap();
        ctrl
    }

    #[tokio::test]
    async fn test_load_datasets_online() {
        let network = Arc::new(StubNetwork::new());
        serve_datasets(&network);
        let ctrl = active_controller(&network).await;

        let datasets = load_datasets(&ctrl).await.unwrap();
        assert_eq!(datasets.neighborhoods, vec!["Gazcue", "Piantini", "Los Mina"]);
        assert_eq!(datasets.routes.len(), 2);
        assert_eq!(datasets.routes[0].id, "1");
        assert_eq!(datasets.alerts[0].severity_class(), "aviso");
        assert_eq!(datasets.dictionary.get("en", "title"), Some("Routes"));
    }

    #[tokio::test]
    async fn test_load_datasets_offline_uses_cache() {
        let network = Arc::new(StubNetwork::new());
        serve_datasets(&network);
        let ctrl = active_controller(&network).await;

        network.set_offline(true);
        let datasets = load_datasets(&ctrl).await.unwrap();
        assert_eq!(datasets.routes.len(), 2);
        assert!(datasets.dictionary.has_language("es"));
    }

    #[tokio::test]
    async fn test_load_datasets_rejects_bad_json() {
        let network = Arc::new(StubNetwork::new());
        serve_datasets(&network);
        let ctrl = active_controller(&network).await;

        network.serve(&format!("http://localhost:8080/{ROUTES_PATH}"), 200, "{not json");
        let err = load_datasets(&ctrl).await.unwrap_err();
        assert!(matches!(&err, Error::Dataset(msg) if msg.starts_with("data/rutas.json")));
    }

    #[tokio::test]
    async fn test_load_datasets_rejects_error_status() {
        let network = Arc::new(StubNetwork::new());
        serve_datasets(&network);
        let ctrl = active_controller(&network).await;

        network.serve(&format!("http://localhost:8080/{ALERTS_PATH}"), 500, "oops");
        let err = load_datasets(&ctrl).await.unwrap_err();
        assert!(matches!(&err, Error::Dataset(msg) if msg == "data/alerts.json: status 500"));
    }
}
