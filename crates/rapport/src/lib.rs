//! Rapport - community relationship graphs.
//!
//! Members of a community declare connections between users; rapport keeps one
//! undirected graph per community and designated channel, renders it as a
//! static Graphviz document or an interactive page, and publishes the page
//! behind a shareable link.
//!
//! The crate is both a library and a CLI. Integrations drive a
//! [`service::GraphService`] directly or feed chat messages through a
//! [`commands::Dispatcher`].

#![forbid(unsafe_code)]

// Core model and persistence
pub mod domain;
pub mod error;
pub mod storage;

// Graph algorithms and rendering
pub mod graph;
pub mod planner;
pub mod render;

// Collaborators behind the service
pub mod confirm;
pub mod membership;
pub mod publish;
pub mod scope;

pub mod service;

// Command implementations
pub mod commands;

// Workspace discovery and the CLI (needed by binary)
pub mod app;
pub mod cli;
pub mod config;
pub mod output;
