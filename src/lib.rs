pub mod app;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod db {
    pub mod catalog;
    pub mod models;
}
pub mod error;
pub mod verify;
