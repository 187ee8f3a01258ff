use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SequencerError {
    #[error("Permutation of length {actual} is not a bijection over a playlist of {expected} items")]
    InvalidPermutation { expected: usize, actual: usize },

    #[error("Unknown play mode: {0}")]
    UnknownPlayMode(String),
}
