mod receiver;
pub use receiver::OutOfBandReceiver;

mod usecase;
pub use usecase::Usecase;

pub mod types;
