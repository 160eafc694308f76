mod field_key;

pub use field_key::HashFieldKey;
