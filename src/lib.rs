pub mod advisor;
pub mod backends;
pub mod config;
pub mod config_loader;
pub mod http;
pub mod outcome;
pub mod persona;
pub mod prompt;
pub mod resolver;
pub mod router;
pub mod saved_messages;
pub mod server;

#[cfg(test)]
pub mod test_support;
