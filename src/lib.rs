pub mod config;
pub mod database;
pub mod forms;
pub mod models;
pub mod services;
pub mod web;
