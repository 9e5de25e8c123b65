//! # features
//!
//! Feature gate evaluation for environment-specific configuration.
//!
//! Two tiers are provided:
//!
//! - [`match_conditions`]: cheap dot-path equality/membership checks, used by
//!   most gates (`storage.provider: [auto, openebs]`)
//! - [`evaluate_expression`] / [`evaluate_value`]: a small expression language
//!   for gates that need boolean or arithmetic composition
//!
//! [`evaluate_defaults`] resolves `${...}` markers in default-value trees,
//! either replacing a whole value or interpolating into surrounding text.
//!
//! ## Example
//!
//! ```
//! use features::{Value, evaluate_expression, match_conditions};
//!
//! let ctx: Value = serde_yaml::from_str("provider: local\nvm: {driver: colima}").unwrap();
//! assert!(evaluate_expression("provider == 'local' && vm.driver != 'docker-desktop'", &ctx).unwrap());
//!
//! let conditions = serde_yaml::from_str(r#"{"vm.driver": [colima, lima]}"#).unwrap();
//! assert!(match_conditions(&conditions, &ctx));
//! ```

pub mod conditions;
pub mod defaults;
pub mod error;
pub mod expr;
pub mod value;

pub use conditions::match_conditions;
pub use defaults::{evaluate_defaults, interpolate, resolve_value};
pub use error::{Error, Result};
pub use expr::{Expression, evaluate_expression, evaluate_value};
pub use value::{Mapping, Value};
