//! Integration tests exercising real Postgres transactions via
//! `#[sqlx::test]`, one file per feature area plus shared `testutils`.

mod auth_tests;
mod bets_tests;
mod scheduler_tests;
mod settlement_tests;

pub mod testutils;
