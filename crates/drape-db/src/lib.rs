//! Drape DB - PostgreSQL persistence for searches and outfit verdicts.

pub mod repository;

pub use repository::SearchRepository;
