//! Transit route estimator: datasets, route search, preferences and the
//! client session that ties them together.

pub mod models;
pub mod preferences;
pub mod search;
pub mod session;

pub use models::{Alert, Datasets, Dictionary, Route};
pub use preferences::{Favorite, Language, Preferences, Theme};
pub use search::{SearchError, find_routes};
pub use session::Session;
