//! SeaORM entities for the `tasks`, `users`, `user_profiles` and `routines` tables.

pub mod routine;
pub mod task;
pub mod user;
pub mod user_profile;

pub mod prelude {
    pub use super::routine::Entity as Routine;
    pub use super::task::Entity as Task;
    pub use super::user::Entity as User;
    pub use super::user_profile::Entity as UserProfile;
}
