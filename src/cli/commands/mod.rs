pub mod config;
pub mod generate;
pub mod history;
pub mod import;
pub mod init;
pub mod projects;
pub mod templates;
