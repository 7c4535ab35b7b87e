pub mod composite;
pub mod email;
pub mod slack;
pub mod teams;
mod webhook;
