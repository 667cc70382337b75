//! HCL front-end for `TabulaConfig`.
//!
//! ```hcl
//! cache {
//!   capacity = 500
//!   ttl_secs = 600
//! }
//!
//! types {
//!   registered = ["date", "money"]
//!   default    = "string"
//! }
//! ```

use tabula_engine::config::{ConfigParser, TabulaConfig};
use tabula_engine::error::EngineError;

pub struct HclParser;

impl ConfigParser for HclParser {
    fn extensions(&self) -> &[&str] {
        &["hcl"]
    }

    fn parse(&self, content: &str) -> Result<TabulaConfig, EngineError> {
        hcl::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }
}
