pub mod open_meteo;
pub mod reddit;

pub use open_meteo::OpenMeteoProvider;
pub use reddit::RedditSearchProvider;
