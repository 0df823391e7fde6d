pub mod board;
pub mod contacts;
pub mod db;
pub mod form;
pub mod memory;
pub mod model;
pub mod output;
pub mod paths;
pub mod store;
pub mod summary;
pub mod tasks;
pub mod validate;
pub mod watch;
