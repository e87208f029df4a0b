//! Asset manifest: the fixed set of requests every generation must hold.

use rutas_core::{AppConfig, Error, RequestIdentity};
use url::Url;

use crate::fetch::{as_base, canonicalize, resolve, within};

#[derive(Debug, Clone)]
pub struct AssetManifest {
    origin: Url,
    assets: Vec<String>,
}

impl AssetManifest {
    /// Build a manifest of asset paths relative to `origin`.
    pub fn new(origin: &str, assets: Vec<String>) -> Result<Self, Error> {
        let origin = canonicalize(origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        if assets.is_empty() {
            return Err(Error::InvalidInput("asset manifest is empty".into()));
        }
        Ok(Self { origin: as_base(origin), assets })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.origin, config.assets.clone())
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// `GET` identity for a path relative to the origin.
    ///
    /// Paths that resolve off the origin (another host, scheme or port, or
    /// above the origin's path) are rejected.
    pub fn identity_for(&self, path: &str) -> Result<RequestIdentity, Error> {
        let url = resolve(&self.origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
        if !within(&self.origin, &url) {
            return Err(Error::InvalidUrl(format!("{path}: outside {}", self.origin)));
        }
        Ok(RequestIdentity::get(url.as_str()))
    }

    /// Every manifest entry paired with its request identity, in manifest order.
    pub fn identities(&self) -> Result<Vec<(String, RequestIdentity)>, Error> {
        self.assets
            .iter()
            .map(|asset| Ok((asset.clone(), self.identity_for(asset)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest_resolves() {
        let manifest = AssetManifest::from_config(&AppConfig::default()).unwrap();
        let identities = manifest.identities().unwrap();

        assert_eq!(identities.len(), 9);
        assert_eq!(identities[0].1.url(), "http://localhost:8080/");
        assert_eq!(identities[4].0, "./data/barrios.json");
        assert_eq!(identities[4].1.url(), "http://localhost:8080/data/barrios.json");
        assert!(identities.iter().all(|(_, id)| id.method() == "GET"));
    }

    #[test]
    fn test_origin_without_trailing_slash() {
        let manifest = AssetManifest::new("https://rutas.example.org/app", vec!["./index.html".into()]).unwrap();
        assert_eq!(manifest.origin().as_str(), "https://rutas.example.org/app/");
        assert_eq!(
            manifest.identity_for("data/rutas.json").unwrap().url(),
            "https://rutas.example.org/app/data/rutas.json"
        );
    }

    #[test]
    fn test_manifest_path_and_dataset_path_share_identity() {
        let manifest = AssetManifest::from_config(&AppConfig::default()).unwrap();
        assert_eq!(
            manifest.identity_for("./data/rutas.json").unwrap(),
            manifest.identity_for("data/rutas.json").unwrap()
        );
    }

    #[test]
    fn test_identity_for_stays_on_origin() {
        let manifest = AssetManifest::new("https://rutas.example.org/app/", vec!["./".into()]).unwrap();

        for path in ["http://evil.example/secret", "//evil.example/secret", "/other/app.js", "../etc"] {
            let result = manifest.identity_for(path);
            assert!(matches!(result, Err(Error::InvalidUrl(_))), "{path} was accepted");
        }
        assert!(manifest.identity_for("https://rutas.example.org/app/js/app.js").is_ok());
    }

    #[test]
    fn test_manifest_with_foreign_asset_fails_to_resolve() {
        let manifest =
            AssetManifest::new("http://localhost:8080/", vec!["./".into(), "https://cdn.example.com/x.js".into()]).unwrap();
        assert!(matches!(manifest.identities(), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_manifest_rejected() {
        let result = AssetManifest::new("http://localhost:8080/", Vec::new());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_bad_origin_rejected() {
        let result = AssetManifest::new("ftp://localhost/", vec!["./".into()]);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
