pub mod assets;
pub mod jobs;
pub mod user;
pub mod webhooks;
