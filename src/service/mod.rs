//! The training service: configuration, the request pipeline and its
//! response envelope.

mod config;
mod envelope;
mod trainer;

pub use config::TrainerConfig;
pub use envelope::ResponseEnvelope;
pub use trainer::{TrainRequest, Trainer};
