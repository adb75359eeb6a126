mod issuer;
pub use issuer::IssuerCredential;

mod usecase;
pub use usecase::Usecase;

pub mod types;
