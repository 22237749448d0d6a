pub mod analysis;
pub mod auth;
pub mod groups;
pub mod invites;
pub mod middleware;
pub mod notifications;
pub mod profiles;
pub mod requests;
pub mod search;
pub mod tools;

mod convert;
