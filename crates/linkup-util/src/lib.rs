pub mod sequence;
pub mod snowflake;
pub mod validation;
