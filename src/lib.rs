pub mod actions;
pub mod db;
pub mod model;
pub mod notes;
pub mod output;
pub mod paths;
pub mod store;
pub mod tasks;
pub mod validate;
pub mod watch;
