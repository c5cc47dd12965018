// Status Saver - library root
// Media discovery and persistence with a self-healing banner ad surface

pub mod ads;
pub mod cli;
pub mod config;
pub mod media;
pub mod observability;
pub mod signals;
