mod holder;
pub use holder::HolderCredential;

mod usecase;
pub use usecase::Usecase;

pub mod types;
