mod member_key;

pub use member_key::SetMemberKey;
