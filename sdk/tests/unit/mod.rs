//! Property-based tests for cadence-sdk
//!
//! ```bash
//! cargo test --test unit -p cadence-sdk
//! ```

mod naming_props;
mod options_props;
mod validator_props;
