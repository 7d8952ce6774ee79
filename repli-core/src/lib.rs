pub mod config;
pub mod error;
pub mod github;
pub mod inspect;
pub mod path_map;
pub mod replicate;
pub mod retry;
pub mod rewrite;
pub mod store;
