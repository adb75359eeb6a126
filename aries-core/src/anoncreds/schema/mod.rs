pub mod types;

mod schema;
pub use schema::Schema;

mod usecase;
pub use usecase::Usecase;
