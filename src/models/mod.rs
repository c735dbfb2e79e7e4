pub mod user;
pub mod view;

pub use user::{
    CreateAccountRequest, HandleSearchRequest, LoginRequest, NewUser, ProfileSummary,
    ProfileUpdate, PublicProfile, UpdateProfileRequest, User,
};
pub use view::{RecordOutcome, ViewKey, VisitRecord};
