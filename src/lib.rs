//! Lead-referral backend for a travel agency: invitation-gated agent
//! registration, session auth, and contact-form leads tied to agents.

pub mod admin;
pub mod app;
pub mod auth;
pub mod config;
pub mod contacts;
pub mod error;
pub mod json;
pub mod mailer;
pub mod notify;
pub mod state;
pub mod store;
