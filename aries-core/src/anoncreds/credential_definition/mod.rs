pub mod types;

mod credential_definition;
pub use credential_definition::CredentialDefinition;

mod usecase;
pub use usecase::Usecase;
