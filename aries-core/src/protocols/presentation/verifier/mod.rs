mod verifier;
pub use verifier::VerifierProof;

mod usecase;
pub use usecase::Usecase;

pub mod types;
