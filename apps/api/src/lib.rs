pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod forms;
pub mod models;
pub mod pages;
pub mod repository;
pub mod routes;
pub mod state;
