use crate::modules::users::core::events::UserEvent;
use crate::modules::users::core::user::User;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CreateUserRejection {
    #[error("User with this email already exists")]
    AlreadyExists,

    #[error("email address is not valid")]
    InvalidEmail,
}

#[derive(Debug)]
pub enum Decision {
    Accepted { user: User, events: Vec<UserEvent> },
    Rejected { reason: CreateUserRejection },
}
