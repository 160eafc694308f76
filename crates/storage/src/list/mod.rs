mod element_key;

pub use element_key::ListElementKey;
