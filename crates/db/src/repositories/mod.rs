//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-table writes run inside a
//! single transaction owned by the repository method.

pub mod emotion_repo;
pub mod empathy_repo;
pub mod invitation_repo;
pub mod need_repo;
pub mod refresh_token_repo;
pub mod session_repo;
pub mod stage_repo;
pub mod strategy_repo;
pub mod user_repo;

pub use emotion_repo::EmotionRepo;
pub use empathy_repo::EmpathyRepo;
pub use invitation_repo::InvitationRepo;
pub use need_repo::NeedRepo;
pub use refresh_token_repo::RefreshTokenRepo;
pub use session_repo::SessionRepo;
pub use stage_repo::StageRepo;
pub use strategy_repo::StrategyRepo;
pub use user_repo::UserRepo;
