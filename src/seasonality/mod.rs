//! Seasonal decomposition.
//!
//! STL splits a monthly series into trend, seasonal and remainder
//! components; the remainder feeds the ARMA models.

mod stl;

pub use stl::{STLResult, STL};
