//! tabfit - request-driven tabular model training
//!
//! Given a CSV dataset, an algorithm name, an optional target column and a
//! hyperparameter mapping, tabfit encodes the data, picks the task type,
//! fits the model and returns its evaluation in one uniform envelope.
//!
//! # Modules
//!
//! - [`data`] - CSV loading, null dropping, feature encoding, target extraction, splitting
//! - [`training`] - Algorithms, task resolution, hyperparameters and model implementations
//! - [`evaluation`] - Classification, regression and clustering metrics
//! - [`service`] - The request pipeline and its response envelope
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use tabfit::service::{TrainRequest, Trainer};
//!
//! let trainer = Trainer::from_env().unwrap();
//! let csv = b"age,income,label\n25,50000,yes\n32,64000,no\n";
//! let request = TrainRequest::new("Logistic Regression").with_target("label");
//! let envelope = trainer.train(csv, &request);
//! println!("{}", envelope.to_json(true).unwrap());
//! ```

pub mod error;

pub mod data;
pub mod evaluation;
pub mod training;

pub mod cli;
pub mod service;

pub use error::{ErrorKind, Result, TabfitError};
pub use service::{ResponseEnvelope, TrainRequest, Trainer, TrainerConfig};
