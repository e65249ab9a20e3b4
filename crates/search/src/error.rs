use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Engine error: {0}")]
    Engine(#[from] scout_engine::EngineError),

    #[error("Empty query")]
    EmptyQuery,
}
