//! The fixed ActionPlan JSON schema and its validator: classifies
//! violations into `(json_pointer, message)` pairs used to build repair
//! prompts (spec §4.4).

mod validator;

pub use validator::{
    format_errors, validate_action_plan, ValidationError, DISALLOWED_SELECTOR_FRAGMENTS,
};
