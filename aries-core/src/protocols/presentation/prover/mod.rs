mod prover;
pub use prover::DisclosedProof;

mod usecase;
pub use usecase::Usecase;

pub mod types;
