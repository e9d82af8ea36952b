#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
// #![warn(clippy::cargo)]

pub mod autodiff;
pub mod batch;
pub mod config;
pub mod covariance;
pub mod error;
pub mod estimate;
pub mod extraction;
pub mod linear;
pub mod math;
pub(crate) mod minimisation;
pub mod model;
pub mod reparam;
pub mod sample;
pub mod table;
pub mod variance;

pub use batch::{averat, Averager};
pub use config::Config;
pub use error::{Error, ErrorKind, Stage};
pub use estimate::RatioEstimate;
pub use table::{RatioRow, RatioTable};

pub type Result<T> = ::std::result::Result<T, Error>;
