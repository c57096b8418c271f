//! Credential verification, session tokens and password reset.

pub mod error;
pub mod password;
pub mod reset;
pub mod service;
pub mod state;
pub mod token;
