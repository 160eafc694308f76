mod member_key;
mod score_key;

pub use member_key::MemberKey;
pub use score_key::ScoreKey;
