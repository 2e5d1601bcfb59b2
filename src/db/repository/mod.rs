pub mod admin;
pub mod member;
pub mod shift;

pub use admin::{AdminRepository, SessionRepository};
pub use member::MemberRepository;
pub use shift::ShiftRepository;
