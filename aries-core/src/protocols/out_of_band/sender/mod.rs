mod sender;
pub use sender::OutOfBandSender;

mod usecase;
pub use usecase::Usecase;

pub mod types;
