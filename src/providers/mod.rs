pub mod youtube;
pub mod youtube_analytics;
pub mod youtube_api;
pub mod youtube_source;
