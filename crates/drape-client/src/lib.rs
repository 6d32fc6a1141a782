//! Drape Client - HTTP clients for external APIs
//!
//! This crate provides the production collaborators of the pipeline:
//!
//! - [`openweather`] - OpenWeatherMap 5 day / 3 hour forecast API
//! - [`openai`] - OpenAI chat completions, for text and vision
//! - [`identity`] - JWT session token verification
//!
//! # Overview
//!
//! The clients handle authentication, request building, response parsing,
//! and error mapping onto [`drape_core::AppError`]. None of them retry.

pub mod identity;
pub mod openai;
pub mod openweather;

// Re-export main client types
pub use identity::JwtIdentity;
pub use openai::OpenAiClient;
pub use openweather::OpenWeatherClient;
