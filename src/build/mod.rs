//! Build orchestration for stylesheet compilation units.
//!
//! The build system turns the registry's compilation units into one
//! aggregate build cycle:
//! - **Discovery**: resolve each unit's source patterns to files
//! - **Pipeline**: run one transform pipeline per unit
//! - **Aggregation**: run all pipelines concurrently and join their outcomes
//!
//! # Example
//!
//! ```ignore
//! use stylebuild::build::AggregateBuild;
//! use stylebuild::registry::UnitRegistry;
//! use stylebuild::transform::TransformChain;
//!
//! let loaded = UnitRegistry::new("python manage.py get_less_compilations").load()?;
//! let build = AggregateBuild::new(TransformChain::from_config(&config.transform), root);
//! let result = build.run(&loaded.units);
//! println!("{}", result.summary());
//! ```

pub mod aggregate;
pub mod discovery;
pub mod pipeline;
pub mod result;

pub use aggregate::*;
pub use discovery::*;
pub use pipeline::*;
pub use result::*;
