pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod generator;
pub mod handlers;
pub mod models;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod routes;
pub mod state;

use config::Config;
use generator::QuizGenerator;
use parser::QuestionParser;
use provider::{init_providers, ProviderState};

/// Selects the AI provider once from `config` and wires the application state.
pub fn build_state(config: Config) -> anyhow::Result<state::AppState> {
    let provider = init_providers(&config);
    build_state_with_provider(config, provider)
}

pub fn build_state_with_provider(config: Config, provider: ProviderState) -> anyhow::Result<state::AppState> {
    let parser = QuestionParser::from_contract()?;
    Ok(state::AppState::new(config, QuizGenerator::new(provider, parser)))
}
