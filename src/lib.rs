// Library exports for ribotrack
pub mod alignment;
pub mod annotation;
pub mod chrom;
pub mod codon;
pub mod error;
pub mod extract;
pub mod logging;
pub mod pause;
pub mod reference;
pub mod report;
pub mod track;
pub mod vectors;

pub use error::{Result, RiboError};
