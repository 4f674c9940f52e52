//! Data models for the optimizer
//!
//! Everything a batch request touches: the formats it can produce, the
//! options it was asked for, the files it received and the results it
//! hands back.

mod capabilities;
mod options;
mod output_format;
mod result;
mod upload;

pub use capabilities::*;
pub use options::*;
pub use output_format::*;
pub use result::*;
pub use upload::*;
