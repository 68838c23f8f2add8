//! HTTP handlers for all web routes.

pub mod accounts;
pub mod chat;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod pages;
pub mod payments;
pub mod staff;
pub mod subscription;
pub mod universities;
