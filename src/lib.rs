pub mod api;
pub mod cache;
pub mod config;
pub mod images;
pub mod jsonv;
pub mod providers;
pub mod report;
pub mod table;
